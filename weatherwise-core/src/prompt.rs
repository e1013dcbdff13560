use crate::{
    llm::{ChatMessage, SamplingParams},
    model::AdviceRequest,
};

const SYSTEM_PROMPT: &str = "Bạn là một chuyên gia thời tiết và đưa ra gợi ý trang phục ngắn gọn, rõ ràng \
cho người dùng dựa trên tình trạng thời tiết hiện tại. \
Chỉ gợi ý trong nhiều nhất là 2 câu. \
Không được lặp từ hoặc lặp ý trong cùng một câu trả lời. \
Không nói 'áo len hoặc áo len'. \
Không đề xuất mũ bảo hiểm, mũ len, áo len, găng tay. \
Không nhắc đến kính râm hoặc chống nắng nếu trời âm u hoặc nhiều mây.";

pub const ADVICE_SAMPLING: SamplingParams = SamplingParams {
    max_tokens: 250,
    temperature: 0.5,
    top_k: 50,
    top_p: 0.95,
    repeat_penalty: 1.0,
};

/// System + user turns asking for clothing advice.
pub fn advice_messages(request: &AdviceRequest) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt(request))]
}

fn user_prompt(request: &AdviceRequest) -> String {
    format!(
        "Hãy đưa ra lời khuyên mặc gì hôm nay với dữ liệu sau:\n\
         Trạng thái trời: {}\n\
         Nhiệt độ: {:.0}°C\n\
         Gió: {:.2} km/h\n\
         Độ ẩm: {}%.\n\
         Nhớ thêm gợi ý hoặc nhắc nhở hữu ích nếu cần.",
        request.condition().phrase(),
        request.temperature_c,
        request.wind_kmh,
        request.humidity_pct,
    )
}
