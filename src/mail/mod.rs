//! # 邮件模块
//!
//! 邮件模板的存取与 `{{key}}` 占位符替换，不负责发送

pub mod placeholder;
pub mod template;

pub use placeholder::{
    GUEST_EMAIL, GUEST_NAME, PlaceholderContext, Recipient, RenderedMail, available_placeholders,
    render, scan_placeholders, test_data,
};
pub use template::{FALLBACK_LANGUAGE, MailTemplateService, TemplateInput};
