//! animedown: 按分集下载番剧
//!
//! - `domain`: 作品、分集以及查询接口
//! - `source`: 内容来源插件
//! - `network`: 视频传输和进度回调
//! - `core`: 下载单元、调度 Actor、错误类型
//! - `config` / `cli` / `ui`: 配置、命令行和终端进度显示

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod network;
pub mod source;
pub mod ui;
pub mod utils;
