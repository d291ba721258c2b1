//! 产物存储服务 - 业务能力层
//!
//! 只负责"在运行目录下读写文件"能力：
//! - 所有路径都落在 `<output_root>/<yyyymmdd>/` 之下
//! - 文件名必须是单一的普通路径段，拒绝 `..`、绝对路径和内嵌分隔符
//! - 写入总是整体覆盖，同一天重复运行时后写者为准

use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileSystemError};
use crate::models::RunContext;

/// 摘要产物的固定文件名
pub const SUMMARY_FILE_NAME: &str = "abstract.md";

/// 音频子目录
pub const AUDIO_DIR_NAME: &str = "audio";

/// 产物存储服务
#[derive(Debug, Clone, Default)]
pub struct OutputStore;

impl OutputStore {
    pub fn new() -> Self {
        Self
    }

    /// 解析运行目录下的文件路径
    pub fn resolve_path(&self, ctx: &RunContext, file_name: &str) -> AppResult<PathBuf> {
        self.resolve_nested(ctx, &[file_name])
    }

    /// 解析运行目录下的多级路径，每一段都单独校验
    pub fn resolve_nested(&self, ctx: &RunContext, segments: &[&str]) -> AppResult<PathBuf> {
        if segments.is_empty() {
            return Err(AppError::unsafe_path("", "路径为空"));
        }

        let run_dir = ctx.run_dir();
        let mut path = run_dir.clone();
        for segment in segments {
            validate_segment(segment)?;
            path.push(segment);
        }

        if !path.starts_with(&run_dir) {
            return Err(AppError::unsafe_path(segments.join("/"), "路径逃逸出运行目录"));
        }

        Ok(path)
    }

    /// 创建日期目录，已存在时静默成功
    pub async fn ensure_run_directory(&self, ctx: &RunContext) -> AppResult<PathBuf> {
        let run_dir = ctx.run_dir();
        create_dir(&run_dir).await?;
        Ok(run_dir)
    }

    /// 写入 UTF-8 文本产物，覆盖已有文件
    pub async fn write_artifact(
        &self,
        ctx: &RunContext,
        file_name: &str,
        content: &str,
    ) -> AppResult<PathBuf> {
        let path = self.resolve_path(ctx, file_name)?;
        if content.trim().is_empty() {
            return Err(AppError::empty_artifact(file_name));
        }

        self.ensure_run_directory(ctx).await?;
        write_file(&path, content.as_bytes()).await?;

        debug!("已写入 {} ({} 字节)", path.display(), content.len());
        Ok(path)
    }

    /// 写入二进制产物（音频），覆盖已有文件
    pub async fn write_binary_artifact(
        &self,
        ctx: &RunContext,
        segments: &[&str],
        data: &[u8],
    ) -> AppResult<PathBuf> {
        let path = self.resolve_nested(ctx, segments)?;
        if data.is_empty() {
            return Err(AppError::empty_artifact(segments.join("/")));
        }

        if let Some(parent) = path.parent() {
            create_dir(parent).await?;
        }
        write_file(&path, data).await?;

        debug!("已写入 {} ({} 字节)", path.display(), data.len());
        Ok(path)
    }

    /// 读取文本产物
    pub async fn read_artifact(&self, ctx: &RunContext, file_name: &str) -> AppResult<String> {
        let path = self.resolve_path(ctx, file_name)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(FileSystemError::NotFound { path }.into())
            }
            Err(source) => Err(FileSystemError::ReadFailed { path, source }.into()),
        }
    }

    /// 清理超过 `keep_days` 天的日期目录
    ///
    /// 只处理名称为 `yyyymmdd` 的目录，其他条目保持不动。返回被删除的目录
    pub async fn prune_old_runs(
        &self,
        output_root: &Path,
        today: NaiveDate,
        keep_days: u32,
    ) -> AppResult<Vec<PathBuf>> {
        let mut removed = Vec::new();

        let mut entries = match fs::read_dir(output_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(removed),
            Err(source) => {
                return Err(FileSystemError::ReadFailed {
                    path: output_root.to_path_buf(),
                    source,
                }
                .into())
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(FileSystemError::ReadFailed {
                        path: output_root.to_path_buf(),
                        source,
                    }
                    .into())
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(dir_date) = parse_date_folder(&name) else {
                continue;
            };
            if !is_dir || (today - dir_date).num_days() <= i64::from(keep_days) {
                continue;
            }

            fs::remove_dir_all(&path)
                .await
                .map_err(|source| FileSystemError::RemoveFailed {
                    path: path.clone(),
                    source,
                })?;
            info!("🗑️ 已清理过期目录: {}", path.display());
            removed.push(path);
        }

        removed.sort();
        Ok(removed)
    }
}

/// 校验单个路径段
fn validate_segment(segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::unsafe_path(segment, "文件名为空"));
    }
    if segment.contains('\0') {
        return Err(AppError::unsafe_path(segment, "包含空字符"));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(AppError::unsafe_path(segment, "包含路径分隔符"));
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) => Err(AppError::unsafe_path(segment, "指向上级目录")),
        (Some(Component::CurDir), _) => Err(AppError::unsafe_path(segment, "指向当前目录")),
        _ => Err(AppError::unsafe_path(segment, "不是普通文件名")),
    }
}

fn parse_date_folder(name: &str) -> Option<NaiveDate> {
    if name.len() != 8 || !name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(name, "%Y%m%d").ok()
}

async fn create_dir(path: &Path) -> AppResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| FileSystemError::CreateDirFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

async fn write_file(path: &Path, data: &[u8]) -> AppResult<()> {
    fs::write(path, data)
        .await
        .map_err(|source| FileSystemError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ValidationError};
    use tempfile::TempDir;

    fn ctx(root: &Path) -> RunContext {
        RunContext::new(NaiveDate::from_ymd_opt(2025, 9, 6).unwrap(), root)
    }

    #[test]
    fn test_resolve_path_layout() {
        let store = OutputStore::new();
        let ctx = ctx(Path::new("/srv/podcast"));
        assert_eq!(
            store.resolve_path(&ctx, SUMMARY_FILE_NAME).unwrap(),
            PathBuf::from("/srv/podcast/20250906/abstract.md")
        );
        assert_eq!(
            store.resolve_path(&ctx, "2509.03236.md").unwrap(),
            PathBuf::from("/srv/podcast/20250906/2509.03236.md")
        );
    }

    #[test]
    fn test_resolve_path_rejects_traversal() {
        let store = OutputStore::new();
        for root in ["/srv/podcast", "/", "/tmp/a/b/c"] {
            let ctx = ctx(Path::new(root));
            for bad in [
                "..",
                ".",
                "",
                "../escape.md",
                "a/../../escape.md",
                "/etc/passwd",
                "\\windows\\system32",
                "cs/0112017.md",
                "nul\0byte",
            ] {
                let err = store.resolve_path(&ctx, bad).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Validation, "{:?} under {}", bad, root);
                assert!(matches!(
                    err,
                    AppError::Validation(ValidationError::UnsafePath { .. })
                ));
            }
        }
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        let path = store
            .write_artifact(&ctx, SUMMARY_FILE_NAME, "# 今日论文\n")
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(
            store.read_artifact(&ctx, SUMMARY_FILE_NAME).await.unwrap(),
            "# 今日论文\n"
        );
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        store.write_artifact(&ctx, "2409.00001.md", "first").await.unwrap();
        store.write_artifact(&ctx, "2409.00001.md", "second").await.unwrap();

        assert_eq!(
            store.read_artifact(&ctx, "2409.00001.md").await.unwrap(),
            "second"
        );
        let count = std::fs::read_dir(ctx.run_dir()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        let err = store.write_artifact(&ctx, "x.md", "  \n").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::EmptyArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        let err = store.read_artifact(&ctx, "missing.md").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::FileSystem(FileSystemError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_run_directory_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        let first = store.ensure_run_directory(&ctx).await.unwrap();
        let second = store.ensure_run_directory(&ctx).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_run_directory_fails_on_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());
        std::fs::write(ctx.run_dir(), "not a directory").unwrap();

        let err = store.ensure_run_directory(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }

    #[tokio::test]
    async fn test_write_binary_into_audio_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let ctx = ctx(temp_dir.path());

        let path = store
            .write_binary_artifact(&ctx, &[AUDIO_DIR_NAME, "podcast_2409.00001.wav"], b"RIFF")
            .await
            .unwrap();
        assert_eq!(
            path,
            ctx.run_dir().join("audio").join("podcast_2409.00001.wav")
        );
        assert!(store
            .write_binary_artifact(&ctx, &[AUDIO_DIR_NAME, ".."], b"RIFF")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_prune_old_runs() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let root = temp_dir.path();
        for name in ["20250820", "20250901", "20250905", "notes", "2025090"] {
            std::fs::create_dir(root.join(name)).unwrap();
        }
        std::fs::write(root.join("20250101"), "file, not dir").unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let removed = store.prune_old_runs(root, today, 7).await.unwrap();

        assert_eq!(removed, vec![root.join("20250820")]);
        assert!(root.join("20250901").exists());
        assert!(root.join("20250905").exists());
        assert!(root.join("notes").exists());
        assert!(root.join("20250101").exists());
    }

    #[tokio::test]
    async fn test_prune_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = OutputStore::new();
        let today = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let removed = store
            .prune_old_runs(&temp_dir.path().join("absent"), today, 7)
            .await
            .unwrap();
        assert!(removed.is_empty());
    }
}
