/**********************************************
  > File Name		: trace.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Thu 20 May 2021 09:41:57 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Access traces replayed by the pager binary.
 *
 * One command per line:
 *   admit <pid> <bytes>
 *   read <pid> <page>
 *   write <pid> <page>
 *   alloc <pid> <bytes>
 *   open <pid> <path>
 *   terminate <pid>
 * Blank lines and lines starting with '#' are skipped.
 */

use std::fs::OpenOptions;
use std::str::FromStr;

use log::info;

use crate::errors::{PagerError, TraceError};
use crate::paging::pager::{Pager, Resolution};
use crate::paging::{PageNumber, ProcessId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceCommand {
    Admit { pid: ProcessId, bytes: usize },
    Access { pid: ProcessId, page: PageNumber, is_write: bool },
    Alloc { pid: ProcessId, bytes: usize },
    Open { pid: ProcessId, path: String },
    Terminate { pid: ProcessId },
}

fn field<'a>(token: Option<&'a str>, what: &'static str, line: &str) -> Result<&'a str, TraceError> {
    token.ok_or_else(|| TraceError::MissingField {
        what,
        line: line.to_string(),
    })
}

fn number<T: FromStr>(token: Option<&str>, what: &'static str, line: &str) -> Result<T, TraceError> {
    let token = field(token, what, line)?;
    token.parse().map_err(|_| TraceError::InvalidNumber {
        what,
        token: token.to_string(),
        line: line.to_string(),
    })
}

impl TraceCommand {
    /*
     * Ok(None) for lines that carry no command.
     */
    pub fn parse(line: &str) -> Result<Option<Self>, TraceError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let mut tokens = line.split_whitespace();
        let cmd = match tokens.next() {
            Some(v) => v,
            None => return Ok(None),
        };
        let pid = number(tokens.next(), "process id", line)?;
        let command = match cmd {
            "admit" => TraceCommand::Admit {
                pid,
                bytes: number(tokens.next(), "size", line)?,
            },
            "read" | "write" => TraceCommand::Access {
                pid,
                page: number(tokens.next(), "page", line)?,
                is_write: cmd == "write",
            },
            "alloc" => TraceCommand::Alloc {
                pid,
                bytes: number(tokens.next(), "size", line)?,
            },
            "open" => TraceCommand::Open {
                pid,
                path: field(tokens.next(), "path", line)?.to_string(),
            },
            "terminate" => TraceCommand::Terminate { pid },
            other => return Err(TraceError::UnknownCommand(other.to_string())),
        };
        if tokens.next().is_some() {
            return Err(TraceError::TrailingTokens(line.to_string()));
        }
        Ok(Some(command))
    }

    /*
     * Run the command, returns a line describing what happened.
     */
    pub fn apply(&self, pager: &mut Pager) -> Result<String, PagerError> {
        match self {
            TraceCommand::Admit { pid, bytes } => {
                pager.admit(*pid, *bytes)?;
                Ok(format!("admitted process {} ({} bytes)", pid, bytes))
            }
            TraceCommand::Access { pid, page, is_write } => {
                let kind = if *is_write { "write" } else { "read" };
                let msg = match pager.resolve(*pid, *page, *is_write)? {
                    Resolution::Hit { frame } => format!("hit in frame {}", frame),
                    Resolution::Loaded { frame } => format!("fault, loaded into frame {}", frame),
                    Resolution::Replaced {
                        frame,
                        victim,
                        written_back,
                    } => format!(
                        "fault, evicted page {} of process {}{} from frame {}",
                        victim.1,
                        victim.0,
                        if written_back { " to swap" } else { "" },
                        frame
                    ),
                };
                Ok(format!("{} page {} of process {}: {}", kind, page, pid, msg))
            }
            TraceCommand::Alloc { pid, bytes } => {
                let block = pager.allocate_block(*pid, *bytes)?;
                Ok(format!("process {} allocated block {} ({} bytes)", pid, block, bytes))
            }
            TraceCommand::Open { pid, path } => {
                let mut options = OpenOptions::new();
                options.read(true).write(true).create(true);
                let handle = pager.open_file(*pid, path, &options)?;
                Ok(format!("process {} opened {} as handle {}", pid, path, handle))
            }
            TraceCommand::Terminate { pid } => {
                let report = pager.terminate(*pid)?;
                info!("process {} terminated", pid);
                Ok(format!(
                    "terminated process {}: {} frames, {} blocks, {} handles released",
                    pid, report.frames_freed, report.released.blocks, report.released.handles
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PagerConfig;
    use std::fs;
    use tempfile::TempDir;

    const PS: usize = 64;

    fn replay(pager: &mut Pager, trace: &str) -> Vec<String> {
        trace
            .lines()
            .filter_map(|line| TraceCommand::parse(line).unwrap())
            .map(|command| command.apply(pager).unwrap())
            .collect()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(
            TraceCommand::parse("admit 1 8192").unwrap(),
            Some(TraceCommand::Admit { pid: 1, bytes: 8192 })
        );
        assert_eq!(
            TraceCommand::parse("  write 2 7 ").unwrap(),
            Some(TraceCommand::Access { pid: 2, page: 7, is_write: true })
        );
        assert_eq!(
            TraceCommand::parse("read 2 0").unwrap(),
            Some(TraceCommand::Access { pid: 2, page: 0, is_write: false })
        );
        assert_eq!(
            TraceCommand::parse("open 3 file1.txt").unwrap(),
            Some(TraceCommand::Open { pid: 3, path: String::from("file1.txt") })
        );
        assert_eq!(
            TraceCommand::parse("terminate 3").unwrap(),
            Some(TraceCommand::Terminate { pid: 3 })
        );
        assert_eq!(TraceCommand::parse("# comment").unwrap(), None);
        assert_eq!(TraceCommand::parse("").unwrap(), None);
    }

    #[test]
    fn reject_bad_lines() {
        assert_eq!(
            TraceCommand::parse("jump 1 2"),
            Err(TraceError::UnknownCommand(String::from("jump")))
        );
        assert_eq!(
            TraceCommand::parse("read 1"),
            Err(TraceError::MissingField {
                what: "page",
                line: String::from("read 1")
            })
        );
        assert_eq!(
            TraceCommand::parse("read x 1"),
            Err(TraceError::InvalidNumber {
                what: "process id",
                token: String::from("x"),
                line: String::from("read x 1")
            })
        );
        assert!(matches!(
            TraceCommand::parse("open 1"),
            Err(TraceError::MissingField { what: "path", .. })
        ));
        assert_eq!(
            TraceCommand::parse("terminate 1 2"),
            Err(TraceError::TrailingTokens(String::from("terminate 1 2")))
        );
    }

    #[test]
    fn replay_reports_each_step() {
        let dir = TempDir::new().unwrap();
        let config = PagerConfig::default()
            .with_page_size(PS)
            .with_frames(1)
            .with_backing_dir(dir.path());
        fs::write(config.executable_path(1), vec![7u8; 2 * PS]).unwrap();
        let mut pager = Pager::new(config).unwrap();

        let opened = dir.path().join("data.txt");
        let trace = format!(
            "# one frame, two pages\n\
             admit 1 {}\n\
             write 1 0\n\
             read 1 0\n\
             \n\
             read 1 1\n\
             alloc 1 1024\n\
             open 1 {}\n\
             terminate 1\n",
            2 * PS,
            opened.display()
        );
        let out = replay(&mut pager, &trace);
        assert_eq!(
            out,
            vec![
                format!("admitted process 1 ({} bytes)", 2 * PS),
                String::from("write page 0 of process 1: fault, loaded into frame 0"),
                String::from("read page 0 of process 1: hit in frame 0"),
                String::from("read page 1 of process 1: fault, evicted page 0 of process 1 to swap from frame 0"),
                String::from("process 1 allocated block 0 (1024 bytes)"),
                format!("process 1 opened {} as handle 0", opened.display()),
                String::from("terminated process 1: 1 frames, 1 blocks, 1 handles released"),
            ]
        );
        assert!(opened.exists());

        let stats = pager.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.faults, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.writebacks, 1);
        assert!(!pager.is_admitted(1));
        assert_eq!(pager.frame_table().num_free(), 1);
    }

    #[test]
    fn oversized_admission_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = PagerConfig::default().with_page_size(PS).with_frames(1).with_backing_dir(dir.path());
        let mut pager = Pager::new(config).unwrap();

        let command = TraceCommand::parse("admit 1 18446744073709551615").unwrap().unwrap();
        assert!(matches!(command.apply(&mut pager), Err(PagerError::InvalidSize)));
        assert!(!pager.is_admitted(1));
    }
}
