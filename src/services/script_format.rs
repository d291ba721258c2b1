//! 台本格式校验 - 业务能力层
//!
//! 语音合成按 `Speaker 1:` / `Speaker 2:` 分配音色，
//! 所以台本必须带固定朗读指令，且只能使用这两种说话人标记

use crate::error::{AppError, AppResult, ValidationError};

/// 台本开头的朗读指令
pub const SCRIPT_HEADER: &str = "Please read aloud the following in a podcast interview style:";

/// 两位说话人
pub const SPEAKER_LABELS: [&str; 2] = ["Speaker 1:", "Speaker 2:"];

const FORBIDDEN_LABELS: [&str; 4] = ["Host:", "Guest:", "ホスト:", "ゲスト:"];

/// 校验台本格式，返回第一个发现的问题
pub fn validate_script(identifier: &str, script: &str) -> AppResult<()> {
    let fail = |reason: String| -> AppResult<()> {
        Err(AppError::Validation(ValidationError::ScriptFormat {
            identifier: identifier.to_string(),
            reason,
        }))
    };

    if !script.contains(SCRIPT_HEADER) {
        return fail("缺少朗读指令开头".to_string());
    }

    for label in SPEAKER_LABELS {
        if !script.contains(label) {
            return fail(format!("缺少说话人 '{}'", label));
        }
    }

    if let Some(label) = FORBIDDEN_LABELS.iter().find(|label| script.contains(*label)) {
        return fail(format!("包含不支持的说话人标记 '{}'", label));
    }

    Ok(())
}
