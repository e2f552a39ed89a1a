/**********************************************
  > File Name		: macros.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Fri 14 May 2021 10:34:16 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Unwrap an io::Result, or log the error and return it
 * as a PagerError::BackingStore naming the file involved.
 */
#[macro_export]
macro_rules! io_or_return {
    ($func: expr, $path: expr) => {{
        match $func {
            Ok(v) => v,
            Err(e) => {
                log::error!("I/O on {:?} failed: {}", $path, e);
                return Err($crate::errors::PagerError::BackingStore {
                    path: ::std::path::PathBuf::from($path),
                    source: e,
                });
            }
        }
    }};
}
