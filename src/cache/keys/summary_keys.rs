use sha2::{Digest, Sha256};

use crate::summarizer::{SummaryOptions, SummarySource};

/// 摘要缓存键前缀
const SUMMARY_PREFIX: &str = "summary:";

/// 计算请求指纹
///
/// 指纹为 SHA-256(SHA-256(来源类型 || 内容) || SHA-256(选项序列化))，
/// 十六进制小写输出，不含任何随机或本机相关的盐。
pub fn fingerprint(source: &SummarySource, options: &SummaryOptions) -> String {
    let mut content = Sha256::new();
    write_field(&mut content, source.kind().as_bytes());
    write_field(&mut content, source.as_bytes());

    let mut opts = Sha256::new();
    write_field(&mut opts, options.length.as_str().as_bytes());
    write_field(&mut opts, options.language.as_bytes());
    write_field(&mut opts, options.style.as_bytes());
    write_field(&mut opts, &[u8::from(options.bullet_points)]);

    let digest = Sha256::new()
        .chain_update(content.finalize())
        .chain_update(opts.finalize())
        .finalize();
    format!("{:x}", digest)
}

// 长度前缀，避免相邻字段拼接产生歧义
fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// 生成摘要缓存键
pub fn summary_cache_key(fingerprint: &str) -> String {
    format!("{}{}", SUMMARY_PREFIX, fingerprint)
}
