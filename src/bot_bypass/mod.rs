//! Escalating strategies for downloads behind JavaScript challenges
//!
//! Some publishers answer programmatic downloads with an HTML challenge page
//! instead of the file. A real browser can pass the challenge; the strategies
//! here drive one and report the URL the file was eventually served from.

pub mod allow_list;
pub mod browser;
pub mod chain;
pub mod hidden_frame;
pub mod window_prompt;

pub use allow_list::BypassAllowList;
pub use browser::{BrowserWrapper, find_browser_executable, launch_browser};
pub use chain::{BotBypassChain, BypassLevel, BypassStrategy};
pub use hidden_frame::HiddenFrameStrategy;
pub use window_prompt::WindowPromptStrategy;
