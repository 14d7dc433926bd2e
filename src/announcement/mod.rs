//! # 公告模块
//!
//! 公告的创建、发布、按时间窗口查询和按语言渲染

mod service;

pub use service::{
    AnnouncementService, FALLBACK_LOCALE, MISSING_CONTENT, NEWS_PAGE_SIZE, NewAnnouncement,
    is_visible_to,
};
