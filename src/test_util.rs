use std::sync::Mutex;

use axum::Router;
use axum::http::StatusCode;

use crate::gateways::{
    GatewayFuture, LanguagePair, RecognitionError, RecognitionFuture, RecognitionGateway,
    TranslationGateway,
};

/// Runs `func` with `HOME` pointed at a fresh temp dir.
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: Mutex<()> = Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only mutated under HOME_MUTEX.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result
}

/// Serves every request on a local port with a fixed status and JSON body.
pub(crate) async fn serve_stub(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().fallback(move || async move {
        (status, [("content-type", "application/json")], body)
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Base URL of a local port with nothing listening on it.
pub(crate) async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}

enum Recognized {
    Text(String),
    Reported(String),
    Unreachable(String),
}

/// Recognition double returning fixed text or a fixed failure.
pub(crate) struct FakeRecognizer {
    result: Recognized,
    pub(crate) calls: Mutex<Vec<Vec<u8>>>,
}

impl FakeRecognizer {
    fn with(result: Recognized) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn text(text: &str) -> Self {
        Self::with(Recognized::Text(text.to_string()))
    }

    /// The service answered and reported `message` for the image.
    pub(crate) fn failing(message: &str) -> Self {
        Self::with(Recognized::Reported(message.to_string()))
    }

    /// The call never got a usable answer.
    pub(crate) fn unreachable(message: &str) -> Self {
        Self::with(Recognized::Unreachable(message.to_string()))
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl RecognitionGateway for FakeRecognizer {
    fn recognize(&self, image: Vec<u8>) -> RecognitionFuture {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(image);
        }
        let result = match &self.result {
            Recognized::Text(text) => Ok(text.clone()),
            Recognized::Reported(message) => Err(RecognitionError::Reported(message.clone())),
            Recognized::Unreachable(message) => Err(RecognitionError::Transport(anyhow::anyhow!(
                message.clone()
            ))),
        };
        Box::pin(async move { result })
    }
}

/// Translation double recording every `(text, languages)` it is asked for.
pub(crate) struct FakeTranslator {
    result: Result<String, String>,
    pub(crate) calls: Mutex<Vec<(String, LanguagePair)>>,
}

impl FakeTranslator {
    pub(crate) fn returning(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl TranslationGateway for FakeTranslator {
    fn translate(&self, text: String, languages: LanguagePair) -> GatewayFuture {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((text, languages));
        }
        let result = self.result.clone().map_err(|message| anyhow::anyhow!(message));
        Box::pin(async move { result })
    }
}
