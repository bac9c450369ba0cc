//! spv-bbtrace command-line tool.

use anyhow::{anyhow, Context, Result};
use log::debug;
use rspirv::binary::{Assemble, Disassemble};
use spv_bbtrace::{BlockTracePass, CounterUpdate, Pass, TraceOptions};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "spv-bbtrace", about = "SPIR-V basic-block trace instrumentation.")]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "print-ir", about = "Parse SPIR-V and print its disassembly")]
    PrintIR {
        #[structopt(help = "SPIR-V file to parse")]
        spv: PathBuf,
    },
    #[structopt(
        name = "instrument",
        about = "Add a counter increment to every reachable basic block"
    )]
    Instrument {
        #[structopt(help = "SPIR-V file to instrument")]
        spv: PathBuf,
        #[structopt(short, long, help = "Where to write the instrumented module")]
        output: PathBuf,
        #[structopt(long, help = "Use 64-bit counters")]
        wide: bool,
        #[structopt(long, help = "Use a racy load/add/store instead of an atomic add")]
        non_atomic: bool,
        #[structopt(long, help = "Write `<label> <trace index>` lines to this file")]
        map: Option<PathBuf>,
    },
}

fn load(path: &Path) -> Result<rspirv::dr::Module> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    debug!("Loaded {} bytes of SPIR-V", bytes.len());
    rspirv::dr::load_bytes(&bytes)
        .map_err(|err| anyhow!("failed to parse {}: {:?}", path.display(), err))
}

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    match opts.command {
        Command::PrintIR { spv } => {
            let module = load(&spv)?;
            println!("{}", module.disassemble());
        }
        Command::Instrument {
            spv,
            output,
            wide,
            non_atomic,
            map,
        } => {
            let mut module = load(&spv)?;
            let mut pass = BlockTracePass::new(TraceOptions {
                wide_counters: wide,
                update: if non_atomic {
                    CounterUpdate::LoadAddStore
                } else {
                    CounterUpdate::Atomic
                },
            });

            let correspondence = Rc::new(RefCell::new(String::new()));
            if map.is_some() {
                let correspondence = correspondence.clone();
                pass.register_block_correspondence_callback(move |labels| {
                    let mut text = correspondence.borrow_mut();
                    for (index, label) in labels.by_index() {
                        let _ = writeln!(text, "{} {}", label, u32::from(index));
                    }
                });
            }

            let status = pass.process(&mut module)?;
            let stats = pass.last_run();
            println!(
                "{}: {:?}, {} blocks traced, {} instrumented",
                pass.name(),
                status,
                stats.blocks_labeled,
                stats.blocks_instrumented
            );

            let bytes = module
                .assemble()
                .iter()
                .flat_map(|word| word.to_le_bytes().to_vec())
                .collect::<Vec<u8>>();
            std::fs::write(&output, bytes)
                .with_context(|| format!("writing {}", output.display()))?;
            if let Some(map) = map {
                std::fs::write(&map, correspondence.borrow().as_bytes())
                    .with_context(|| format!("writing {}", map.display()))?;
            }
        }
    }

    Ok(())
}
