use std::sync::Arc;

use crate::gateways::{LanguagePair, RecognitionGateway, TranslationGateway};
use crate::script::ScriptDetector;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) recognizer: Arc<dyn RecognitionGateway>,
    pub(crate) translator: Arc<dyn TranslationGateway>,
    pub(crate) detector: ScriptDetector,
    pub(crate) languages: LanguagePair,
}
