/**********************************************
  > File Name		: main.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Thu 20 May 2021 10:15:02 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

use pager::config::{PAGE_SIZE, PHYSICAL_MEMORY_SIZE};
use pager::trace::TraceCommand;
use pager::{Pager, PagerConfig};

#[derive(Parser, Debug)]
#[command(name = "pager")]
#[command(about = "Replay a memory access trace against a demand paging simulator", long_about = None)]
struct Cli {
    /// Trace file, one command per line
    trace: PathBuf,

    /// Page size in bytes
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Physical memory size in bytes
    #[arg(long, default_value_t = PHYSICAL_MEMORY_SIZE)]
    physical_memory: usize,

    /// Number of physical frames, overrides --physical-memory
    #[arg(long)]
    frames: Option<usize>,

    /// Directory holding process_<pid>_executable.bin and swap files
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = PagerConfig::default()
        .with_page_size(cli.page_size)
        .with_physical_memory_size(cli.physical_memory)
        .with_backing_dir(&cli.dir);
    if let Some(frames) = cli.frames {
        config = config.with_frames(frames);
    }

    let mut pager = match Pager::new(config) {
        Ok(v) => v,
        Err(e) => {
            error!("{}", e);
            eprintln!("pager: {}", e);
            process::exit(2);
        }
    };

    let trace = match fs::read_to_string(&cli.trace) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("pager: cannot read {}: {}", cli.trace.display(), e);
            process::exit(2);
        }
    };

    let mut failed = false;
    for (lineno, line) in trace.lines().enumerate() {
        let command = match TraceCommand::parse(line) {
            Ok(Some(v)) => v,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}:{}: {}", cli.trace.display(), lineno + 1, e);
                failed = true;
                continue;
            }
        };
        match command.apply(&mut pager) {
            Ok(msg) => println!("{}", msg),
            Err(e) => {
                eprintln!("{}:{}: {}", cli.trace.display(), lineno + 1, e);
                failed = true;
            }
        }
    }

    let stats = pager.stats();
    println!(
        "{} accesses: {} hits, {} faults, {} evictions, {} write-backs",
        pager.clock(),
        stats.hits,
        stats.faults,
        stats.evictions,
        stats.writebacks
    );
    if failed {
        process::exit(1);
    }
}
