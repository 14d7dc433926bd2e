//! # 密钥加密模块
//!
//! 服务商 API 密钥落库前加密、读取时解密。密钥在启动时安装到进程级的全局状态，
//! 之后所有读写都通过 [`encrypt_secret`] / [`decrypt_secret`] 完成。

use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{AdminError, Result};
use crate::{ldebug, lwarn, logging::{LogComponent, LogStage}};

/// 密钥环境变量
pub const ENCRYPTION_KEY_ENV: &str = "AI_ADMIN_ENCRYPTION_KEY";

static GLOBAL_CRYPTO: OnceLock<ConfigCrypto> = OnceLock::new();

/// 加密的配置值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    /// Base64编码的加密数据
    pub data: String,
    /// Base64编码的随机数
    pub nonce: String,
}

/// 配置加密器
pub struct ConfigCrypto {
    cipher: Aes256Gcm,
}

impl ConfigCrypto {
    /// 创建新的配置加密器
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        let key: [u8; 32] = *key;
        let key = key.into();
        let cipher = Aes256Gcm::new(&key);
        Self { cipher }
    }

    /// 从64位十六进制字符串创建加密器
    pub fn from_hex(key_str: &str) -> Result<Self> {
        let key_str = key_str.trim();
        if key_str.len() != 64 {
            return Err(AdminError::config(
                "加密密钥必须是64个字符的十六进制字符串（32字节）",
            ));
        }

        let key_bytes = hex::decode(key_str)
            .map_err(|e| AdminError::config_with_source("加密密钥格式错误", e))?;

        let key: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| AdminError::config("加密密钥必须是32字节"))?;
        Ok(Self::new(&key))
    }

    /// 从环境变量创建加密器，未设置时返回 `None`
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(ENCRYPTION_KEY_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::from_hex(&value).map(Some),
            _ => Ok(None),
        }
    }

    /// 加密字符串
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| {
                AdminError::crypto_with_source(
                    "密钥加密失败",
                    anyhow::anyhow!("AES-GCM encryption failed: {e}"),
                )
            })?;

        Ok(EncryptedValue {
            data: general_purpose::STANDARD.encode(&ciphertext),
            nonce: general_purpose::STANDARD.encode(nonce),
        })
    }

    /// 解密字符串
    pub fn decrypt(&self, encrypted: &EncryptedValue) -> Result<String> {
        let ciphertext = general_purpose::STANDARD
            .decode(&encrypted.data)
            .map_err(|e| AdminError::crypto_with_source("加密数据格式错误", e))?;

        let nonce_bytes: [u8; 12] = general_purpose::STANDARD
            .decode(&encrypted.nonce)
            .map_err(|e| AdminError::crypto_with_source("加密随机数格式错误", e))?
            .try_into()
            .map_err(|_| AdminError::crypto("加密随机数长度错误"))?;
        let nonce = nonce_bytes.into();

        let plaintext = self
            .cipher
            .decrypt(&nonce, ciphertext.as_ref())
            .map_err(|e| {
                AdminError::crypto_with_source(
                    "密钥解密失败",
                    anyhow::anyhow!("AES-GCM decryption failed: {e}"),
                )
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| AdminError::crypto_with_source("解密后的数据不是有效的UTF-8字符串", e))
    }

    /// 加密并序列化为可直接落库的 JSON 信封
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let encrypted = self.encrypt(plaintext)?;
        Ok(serde_json::to_string(&encrypted)?)
    }

    /// 解析 JSON 信封并解密
    pub fn open(&self, stored: &str) -> Result<String> {
        let encrypted: EncryptedValue = serde_json::from_str(stored)
            .map_err(|e| AdminError::crypto_with_source("存储的密钥不是有效的加密信封", e))?;
        self.decrypt(&encrypted)
    }

    /// 生成新的加密密钥
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    /// 安装为进程级加密器；已安装时保留先前的实例
    pub fn install_global(self) -> Result<&'static Self> {
        if GLOBAL_CRYPTO.set(self).is_err() {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Crypto,
                "crypto_already_installed",
                "全局加密器已初始化，忽略重复安装"
            );
        } else {
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Crypto,
                "crypto_installed",
                "全局加密器已安装"
            );
        }
        Self::global()
    }

    /// 当前进程级加密器
    pub fn global() -> Result<&'static Self> {
        GLOBAL_CRYPTO.get().ok_or_else(|| {
            AdminError::crypto(format!(
                "加密密钥未初始化，请设置 {ENCRYPTION_KEY_ENV} 或 crypto.encryption_key"
            ))
        })
    }

    /// 是否已安装进程级加密器
    #[must_use]
    pub fn is_installed() -> bool {
        GLOBAL_CRYPTO.get().is_some()
    }
}

/// 使用进程级加密器加密
pub fn encrypt_secret(plaintext: &str) -> Result<String> {
    ConfigCrypto::global()?.seal(plaintext)
}

/// 使用进程级加密器解密
pub fn decrypt_secret(stored: &str) -> Result<String> {
    ConfigCrypto::global()?.open(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_crypto_encrypt_decrypt() {
        let key = [0u8; 32];
        let crypto = ConfigCrypto::new(&key);

        let plaintext = "sensitive_api_key_12345";
        let encrypted = crypto.encrypt(plaintext).unwrap();
        let decrypted = crypto.decrypt(&encrypted).unwrap();

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_seal_hides_plaintext() {
        let crypto = ConfigCrypto::new(&[7u8; 32]);
        let sealed = crypto.seal("sk-live-abc").unwrap();

        assert!(!sealed.contains("sk-live-abc"));
        assert_eq!(crypto.open(&sealed).unwrap(), "sk-live-abc");
    }

    #[test]
    fn test_open_rejects_wrong_key_and_garbage() {
        let sealed = ConfigCrypto::new(&[1u8; 32]).seal("secret").unwrap();
        let other = ConfigCrypto::new(&[2u8; 32]);

        assert!(matches!(other.open(&sealed), Err(AdminError::Crypto { .. })));
        assert!(matches!(other.open("plain-text-key"), Err(AdminError::Crypto { .. })));
    }

    #[test]
    fn test_generate_key() {
        let key1 = ConfigCrypto::generate_key();
        let key2 = ConfigCrypto::generate_key();

        assert_eq!(key1.len(), 64); // 32 bytes in hex
        assert_ne!(key1, key2);
        assert!(ConfigCrypto::from_hex(&key1).is_ok());
    }

    #[test]
    fn test_from_hex_validation() {
        assert!(ConfigCrypto::from_hex("abcd").is_err());
        assert!(ConfigCrypto::from_hex(&"zz".repeat(32)).is_err());
    }
}
