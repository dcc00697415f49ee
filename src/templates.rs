use handlebars::Handlebars;
use std::{path::Path, sync::Arc};

use crate::error::AlarmError;

pub type Hbs = Arc<Handlebars<'static>>;

pub const PROMPT_ALERT: &str = "prompt/alert_mail";
pub const MAIL_ALERT: &str = "mail/alert";
pub const MAIL_WELCOME: &str = "mail/welcome";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "당신은 주식 시장 분석가입니다.
다음 정보를 바탕으로 간결한 투자 코멘트를 작성하세요.

종목: {{stock_name}} ({{stock_code}})
변동률: {{change_rate}}%
기준: {{threshold_direction}}
코스피: {{kospi}} ({{kospi_change}}, {{kospi_change_rate}}%)
코스닥: {{kosdaq}} ({{kosdaq_change}}, {{kosdaq_change_rate}}%)

요구사항: 3-5문장, 객관적 사실 위주, 투자 권유 금지, 한국어
";

const ALERT_MAIL_TEMPLATE: &str = "{{stock_name}}({{stock_code}}) 종목이 설정하신 {{direction}} 기준에 도달했습니다.

■ 알림 요약
- 등록가: {{base_price}}원
- 현재가: {{current_price}}원
- 변동률: {{change_rate}}%
- 설정 기준: {{threshold_value}}%

■ 시장 현황
- 코스피: {{kospi}} ({{kospi_change}}, {{kospi_change_rate}}%)
- 코스닥: {{kosdaq}} ({{kosdaq_change}}, {{kosdaq_change_rate}}%)

■ AI 코멘트
{{comment}}

※ 위 코멘트는 AI가 생성한 참고 정보이며 투자 권유가 아닙니다.

---
알림 설정 변경: {{settings_url}}
Stock Alarm 서비스
";

const WELCOME_MAIL_TEMPLATE: &str = "Stock Alarm 서비스에 등록해 주셔서 감사합니다.

아래 링크에서 알림을 받고 싶은 종목을 설정하세요:
{{settings_url}}

이 링크는 본인만 사용할 수 있는 고유 URL입니다.
분실 시 동일한 이메일로 재발급 받을 수 있습니다.

---
Stock Alarm 서비스
";

/// Builds the registry for the LLM prompt and the plaintext mails.
///
/// The prompt is read from `prompt_path` when it exists and parses; anything
/// else falls back to [`DEFAULT_PROMPT_TEMPLATE`].
pub fn build_handlebars(prompt_path: &Path) -> Result<Hbs, AlarmError> {
    let mut hb = Handlebars::new();
    // plaintext output, nothing to escape
    hb.register_escape_fn(handlebars::no_escape);

    let custom = match std::fs::read_to_string(prompt_path) {
        Ok(source) => match hb.register_template_string(PROMPT_ALERT, source) {
            Ok(()) => {
                tracing::debug!(path = %prompt_path.display(), "loaded prompt template");
                true
            }
            Err(e) => {
                tracing::warn!(path = %prompt_path.display(), error = %e, "prompt template does not parse, using default");
                false
            }
        },
        Err(e) => {
            tracing::warn!(path = %prompt_path.display(), error = %e, "prompt template missing, using default");
            false
        }
    };
    if !custom {
        hb.register_template_string(PROMPT_ALERT, DEFAULT_PROMPT_TEMPLATE)?;
    }

    hb.register_template_string(MAIL_ALERT, ALERT_MAIL_TEMPLATE)?;
    hb.register_template_string(MAIL_WELCOME, WELCOME_MAIL_TEMPLATE)?;

    Ok(Arc::new(hb))
}
