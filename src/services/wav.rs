//! 音频封装 - 业务能力层
//!
//! 语音服务返回裸 PCM（`audio/L16;rate=24000`）时补上 RIFF/WAV 头，
//! 已是容器格式的直接按扩展名保存

use crate::error::{AppError, AppResult, ValidationError};

const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;

/// PCM 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub bits_per_sample: u16,
    pub sample_rate: u32,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// 从 MIME 类型解析 PCM 参数，缺失或非法的部分取默认值
pub fn parse_audio_mime_type(mime_type: &str) -> PcmFormat {
    let mut format = PcmFormat::default();

    for param in mime_type.split(';').map(str::trim) {
        if let Some(rate) = param
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("rate="))
            .and_then(|_| param[5..].trim().parse::<u32>().ok())
        {
            format.sample_rate = rate;
        } else if let Some(bits) = param
            .strip_prefix("audio/L")
            .and_then(|bits| bits.parse::<u16>().ok())
        {
            format.bits_per_sample = bits;
        }
    }

    format
}

/// 已知容器格式的扩展名
pub fn container_extension(mime_type: &str) -> Option<&'static str> {
    let base = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" => Some("flac"),
        _ => None,
    }
}

/// 给裸 PCM 数据加上 44 字节的 WAV 头
///
/// 头部字段都是 u32，采样率或数据长度放不下时返回错误
pub fn wrap_pcm_as_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, String> {
    let data_size = u32::try_from(pcm.len())
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| format!("音频数据过大: {} 字节", pcm.len()))?;
    let block_align = CHANNELS * (format.bits_per_sample / 8);
    let byte_rate = format
        .sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(|| format!("采样率过大: {}", format.sample_rate))?;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);
    Ok(wav)
}

/// 转成可落盘的音频：返回 (扩展名, 数据)
pub fn encode_for_storage(mime_type: &str, data: Vec<u8>) -> AppResult<(&'static str, Vec<u8>)> {
    if let Some(ext) = container_extension(mime_type) {
        return Ok((ext, data));
    }

    let wav = wrap_pcm_as_wav(&data, parse_audio_mime_type(mime_type)).map_err(|reason| {
        AppError::Validation(ValidationError::AudioFormat {
            mime_type: mime_type.to_string(),
            reason,
        })
    })?;
    Ok(("wav", wav))
}
