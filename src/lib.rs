/**********************************************
  > File Name		: lib.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 09:05:11 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

pub mod config;
pub mod errors;
pub mod macros;
pub mod paging;
pub mod process;
pub mod trace;

pub use config::PagerConfig;
pub use errors::{PagerError, TraceError};
pub use paging::pager::{Pager, PagerStats, Resolution, TerminationReport};
pub use paging::shared::SharedPager;
pub use paging::{FrameId, PageNumber, ProcessId};
