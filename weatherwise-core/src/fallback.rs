//! Rule-based clothing advice, used whenever the language model cannot answer.

use crate::model::AdviceRequest;

/// Temperature bands; lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Below 10°C.
    Cold,
    /// 10°C up to (not including) 20°C.
    Cool,
    /// 20°C up to (not including) 30°C.
    Warm,
    /// 30°C and above, relative humidity over 70%.
    HumidHeat,
    /// 30°C and above, relative humidity 70% or less.
    DryHeat,
}

impl Band {
    pub fn classify(temperature_c: f64, humidity_pct: u8) -> Self {
        if temperature_c < 10.0 {
            Self::Cold
        } else if temperature_c < 20.0 {
            Self::Cool
        } else if temperature_c < 30.0 {
            Self::Warm
        } else if humidity_pct > 70 {
            Self::HumidHeat
        } else {
            Self::DryHeat
        }
    }
}

/// Deterministic one-sentence advice for `request`.
pub fn advise(request: &AdviceRequest) -> String {
    let sky = request.condition().phrase().to_lowercase();

    match Band::classify(request.temperature_c, request.humidity_pct) {
        Band::Cold => format!(
            "Trời lạnh và {sky}, bạn nên mặc áo khoác dày, quần dài và giày kín để giữ ấm."
        ),
        Band::Cool => format!(
            "Thời tiết mát mẻ và {sky}, một chiếc áo khoác nhẹ hoặc áo dài tay là đủ."
        ),
        Band::Warm => format!(
            "Thời tiết dễ chịu và {sky}, hãy chọn áo thun hoặc sơ mi mỏng cùng quần thoải mái."
        ),
        Band::HumidHeat => format!(
            "Trời nóng ẩm và {sky}, hãy mặc đồ cotton thoáng, thấm hút mồ hôi và uống nhiều nước."
        ),
        Band::DryHeat => format!(
            "Trời nóng khô và {sky}, nên mặc quần áo sáng màu, rộng rãi và đội mũ rộng vành khi ra ngoài."
        ),
    }
}
