//! One weather lookup at a time, run off the caller's thread.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    advice::AdviceEngine,
    model::WeatherReport,
    provider::{FetchError, WeatherProvider},
};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("A lookup is already in progress")]
    Busy,
    #[error("No city name given")]
    EmptyCity,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Lookup task stopped unexpectedly: {0}")]
    Aborted(String),
}

impl LookupError {
    /// Message shown to the user in place of a report.
    pub fn user_message(&self) -> String {
        match self {
            LookupError::Busy => "Đang tra cứu, vui lòng chờ.".to_string(),
            LookupError::EmptyCity => "Vui lòng nhập tên thành phố.".to_string(),
            LookupError::Fetch(err) => fetch_message(err),
            LookupError::Aborted(reason) => format!("Lỗi yêu cầu:\n{reason}"),
        }
    }
}

fn fetch_message(err: &FetchError) -> String {
    match err {
        FetchError::InvalidResponse(_) => {
            "Không tìm thấy thành phố hoặc phản hồi không hợp lệ.".to_string()
        }
        FetchError::Http { status, .. } => match status {
            400 => "Yêu cầu không hợp lệ.".to_string(),
            401 => "API key không hợp lệ.".to_string(),
            403 => "Truy cập bị từ chối!".to_string(),
            404 => "Không tìm thấy thành phố!".to_string(),
            500 => "Lỗi máy chủ nội bộ.".to_string(),
            502 => "Bad Gateway.".to_string(),
            503 => "Dịch vụ không khả dụng.".to_string(),
            504 => "Gateway Timeout.".to_string(),
            other => format!("Lỗi HTTP không xác định: {other}"),
        },
        FetchError::Connection(_) => "Lỗi kết nối!\nVui lòng kiểm tra kết nối Internet.".to_string(),
        FetchError::Timeout => "Lỗi thời gian chờ.\nYêu cầu quá thời gian cho phép.".to_string(),
        FetchError::TooManyRedirects => "Quá nhiều chuyển hướng. Kiểm tra URL.".to_string(),
        FetchError::Request(reason) => format!("Lỗi yêu cầu:\n{reason}"),
    }
}

/// Clears the in-flight flag when the lookup task ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A submitted lookup.
#[derive(Debug)]
pub struct PendingLookup {
    handle: JoinHandle<Result<WeatherReport, LookupError>>,
}

impl PendingLookup {
    pub async fn wait(self) -> Result<WeatherReport, LookupError> {
        self.handle.await.map_err(|e| LookupError::Aborted(e.to_string()))?
    }
}

/// Fetches weather and advice for a city, refusing a second lookup while
/// one is outstanding.
#[derive(Debug, Clone)]
pub struct Lookup {
    provider: Arc<dyn WeatherProvider>,
    advice: AdviceEngine,
    runtime: Handle,
    in_flight: Arc<AtomicBool>,
}

impl Lookup {
    pub fn new(provider: Arc<dyn WeatherProvider>, advice: AdviceEngine, runtime: Handle) -> Self {
        Self {
            provider,
            advice,
            runtime,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn advice(&self) -> &AdviceEngine {
        &self.advice
    }

    /// True while a submitted lookup has not finished.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a lookup in the background.
    pub fn submit(&self, city: &str) -> Result<PendingLookup, LookupError> {
        let city = city.trim().to_string();
        if city.is_empty() {
            return Err(LookupError::EmptyCity);
        }

        let guard = InFlight::acquire(&self.in_flight).ok_or(LookupError::Busy)?;

        let provider = Arc::clone(&self.provider);
        let advice = self.advice.clone();

        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            run(provider.as_ref(), &advice, &city).await
        });

        Ok(PendingLookup { handle })
    }

    /// Submit and wait.
    pub async fn lookup(&self, city: &str) -> Result<WeatherReport, LookupError> {
        self.submit(city)?.wait().await
    }
}

async fn run(
    provider: &dyn WeatherProvider,
    advice: &AdviceEngine,
    city: &str,
) -> Result<WeatherReport, LookupError> {
    debug!(%city, "lookup started");

    let observation = provider.current_weather(city).await.map_err(|err| {
        warn!(%city, error = %err, "weather fetch failed");
        err
    })?;

    let advice = advice.get_advice(&observation.advice_request()).await;
    Ok(WeatherReport { observation, advice })
}
