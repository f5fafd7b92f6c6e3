//! xmlpull - print the node stream of an XML document
//!
//! One line per node: depth, node type, name, escaped value and the
//! line:column where the node starts. Attributes follow their element.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xmlpull::{ConformanceLevel, ReaderSettings, WhitespaceHandling, XmlReader, XmlTextReader};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                PEAK_ALLOCATED.fetch_max(current, Ordering::Relaxed);
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(feature = "memory_tracking")]
fn report_memory() {
    use std::sync::atomic::Ordering;
    eprintln!(
        "memory: current {} bytes, peak {} bytes",
        tracking::ALLOCATED.load(Ordering::SeqCst),
        tracking::PEAK_ALLOCATED.load(Ordering::SeqCst)
    );
}

#[cfg(not(feature = "memory_tracking"))]
fn report_memory() {
    eprintln!("memory: build with --features memory_tracking to collect statistics");
}

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "xmlpull")]
#[command(about = "Print the nodes of an XML document, one per line")]
struct Args {
    /// Input file (standard input when absent or "-")
    file: Option<PathBuf>,

    /// Accept any number of top-level elements and text
    #[arg(long)]
    fragment: bool,

    /// Which whitespace nodes to report
    #[arg(long, value_enum, default_value_t = Whitespace::All)]
    whitespace: Whitespace,

    /// Parse comments without reporting them
    #[arg(long)]
    ignore_comments: bool,

    /// Feed the reader at most N bytes per read
    #[arg(long, value_name = "N")]
    chunk_size: Option<usize>,

    /// Print only the number of nodes
    #[arg(long)]
    count: bool,

    /// Print memory statistics to stderr when done
    #[arg(long)]
    stats: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Whitespace {
    All,
    Significant,
    None,
}

impl From<Whitespace> for WhitespaceHandling {
    fn from(w: Whitespace) -> Self {
        match w {
            Whitespace::All => WhitespaceHandling::All,
            Whitespace::Significant => WhitespaceHandling::Significant,
            Whitespace::None => WhitespaceHandling::None,
        }
    }
}

/// Hands out at most `size` bytes per read
struct ChunkedRead<R> {
    inner: R,
    size: usize,
}

impl<R: Read> Read for ChunkedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.size);
        self.inner.read(&mut buf[..n])
    }
}

fn open_input(args: &Args) -> io::Result<Box<dyn Read>> {
    let input: Box<dyn Read> = match args.file.as_deref() {
        Some(path) if path.as_os_str() != "-" => Box::new(File::open(path)?),
        _ => Box::new(io::stdin().lock()),
    };
    Ok(match args.chunk_size {
        Some(size) => Box::new(ChunkedRead { inner: input, size: size.max(1) }),
        None => input,
    })
}

/// Write every node; returns the number of nodes read
fn dump<R: Read, W: Write>(
    reader: &mut XmlTextReader<R>,
    out: &mut W,
    count_only: bool,
) -> Result<usize, Box<dyn Error>> {
    let mut count = 0;
    while reader.read()? {
        count += 1;
        if count_only {
            continue;
        }
        write_node(reader, out)?;
        if reader.move_to_first_attribute() {
            loop {
                write_node(reader, out)?;
                if !reader.move_to_next_attribute() {
                    break;
                }
            }
            reader.move_to_element();
        }
    }
    if count_only {
        writeln!(out, "{count}")?;
    }
    Ok(count)
}

fn write_node<R: Read, W: Write>(reader: &XmlTextReader<R>, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}:{}",
        reader.depth(),
        reader.node_type(),
        reader.name(),
        reader.value().escape_debug(),
        reader.line_number(),
        reader.line_position()
    )
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "xmlpull=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let input = match open_input(&args) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("xmlpull: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = ReaderSettings {
        conformance_level: if args.fragment {
            ConformanceLevel::Fragment
        } else {
            ConformanceLevel::Document
        },
        whitespace_handling: args.whitespace.into(),
        ignore_comments: args.ignore_comments,
        ..Default::default()
    };
    let mut reader = XmlTextReader::with_settings(input, settings);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = dump(&mut reader, &mut out, args.count).and_then(|count| {
        out.flush()?;
        Ok(count)
    });

    let status = match result {
        Ok(count) => {
            debug!(nodes = count, encoding = reader.encoding(), "document read");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("xmlpull: {e}");
            ExitCode::FAILURE
        }
    };
    if args.stats {
        report_memory();
    }
    status
}
