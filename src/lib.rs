//! # PicGo 图片上传工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                宿主界面（命令行 / 启动器）                 │
//! │                                                          │
//! │   下拉框 ── 文件选择 ── 复制格式 ── 插件管理              │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                                                  │
//! │  ┌─ upload ────── 唯一上传入口：校验输入 + 检查结果        │
//! │  │                                                       │
//! │  ├─ context ───── UploaderContext<E>（配置适配层）         │
//! │  │   ├─ selection     UserUploaderConfig（按 id 引用）     │
//! │  │   └─ timeout       上传超时竞速                         │
//! │  │                                                       │
//! │  ├─ form ──────── 下拉框模型 / 表单值 / 图片过滤           │
//! │  ├─ format ────── URL / Markdown / HTML / UBB / 自定义     │
//! │  ├─ storage ───── 上次选中的配置（JSON 键值文件）          │
//! │  ├─ settings ──── 偏好设置（超时、模板、代理、npm）        │
//! │  └─ clipboard ─── 写回剪贴板                              │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ UploadEngine trait
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  engine::picgo_cli   ~/.picgo/config.json + picgo 命令行  │
//! │  engine::memory      进程内引擎（测试 / 演示）            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` 及错误分类 |
//! | [`timeout`] | 上传调用与计时器竞速，超时文案与超时值解析 |
//! | [`engine`] | `UploadEngine` 接口、引擎数据结构与两种引擎实现 |
//! | [`settings`] | 偏好设置的读写与默认值 |
//! | [`storage`] | 界面状态持久化 |
//! | [`context`] | 配置校验、同步、默认选择、日期目录改写与透传操作 |
//! | [`format`] | 复制格式注册表 |
//! | [`form`] | 上传表单的数据侧 |
//! | [`upload`] | 上传流程与失败报告 |
//! | [`clipboard`] | 剪贴板文本写入 |

pub mod error;
pub mod timeout;
pub mod engine;
pub mod settings;
pub mod storage;
pub mod context;
pub mod format;
pub mod form;
pub mod upload;
pub mod clipboard;
