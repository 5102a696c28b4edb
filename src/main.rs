//! lrfkit - inspect, paginate and retag LRF ebooks

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lrfkit::layout::{LayoutConfig, MonospaceMeasurer};
use lrfkit::render::{FixedPitchProvider, FontCache, FontMeasurer};
use lrfkit::{Book, ImageEncoding, InfoField, LoadOptions, PageMap};

#[derive(Parser)]
#[command(name = "lrfkit")]
#[command(version, about = "Inspect, paginate and retag LRF ebooks", long_about = None)]
#[command(after_help = "EXAMPLES:
    lrfkit info book.lrf                     Show metadata
    lrfkit pages book.lrf --width 600        Paginate for a 600px wide screen
    lrfkit set-meta book.lrf --title \"New\"   Rewrite the title in place")]
struct Cli {
    /// Stop at the first malformed object instead of skipping it
    #[arg(long, global = true)]
    strict: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show header fields and metadata
    Info { input: PathBuf },
    /// List every object with its attributes
    Dump { input: PathBuf },
    /// Print the table of contents
    Toc {
        input: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Paginate and print per-page statistics
    Pages {
        input: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Also print each page's text
        #[arg(long)]
        text: bool,
    },
    /// Print the book's text in reading order
    Text { input: PathBuf },
    /// Change metadata and write the file back out
    SetMeta(SetMetaArgs),
}

#[derive(Args)]
struct LayoutArgs {
    /// Resolution to scale text to (default: from the file)
    #[arg(long)]
    dpi: Option<u16>,
    /// Screen width in pixels (default: from the file)
    #[arg(long)]
    width: Option<u16>,
    /// Screen height in pixels (default: from the file)
    #[arg(long)]
    height: Option<u16>,
}

#[derive(Args)]
struct SetMetaArgs {
    input: PathBuf,
    /// Output file (default: overwrite the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long)]
    title: Option<String>,
    /// Author; repeat for several
    #[arg(long = "author")]
    authors: Vec<String>,
    /// Any DocInfo field, as NAME=VALUE (e.g. Publisher=Acme)
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,
    /// New cover thumbnail image
    #[arg(long)]
    cover: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let options = LoadOptions {
        strict: cli.strict,
        ..LoadOptions::default()
    };
    let result = match &cli.command {
        Command::Info { input } => show_info(input, options, cli.json),
        Command::Dump { input } => dump(input, options, cli.json),
        Command::Toc { input, layout } => show_toc(input, options, layout, cli.json),
        Command::Pages { input, layout, text } => show_pages(input, options, layout, *text, cli.json),
        Command::Text { input } => Book::open(input, options)
            .map(|book| print!("{}", book.plain_text()))
            .map_err(|e| e.to_string()),
        Command::SetMeta(args) => set_meta(args, options),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "lrfkit=debug"
    } else if quiet {
        "lrfkit=warn"
    } else {
        "lrfkit=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

#[derive(Serialize)]
struct InfoReport {
    file: String,
    version: u16,
    objects: u64,
    screen: (u16, u16),
    dpi: u16,
    fields: Vec<(String, String)>,
    thumbnail: Option<ThumbnailReport>,
}

#[derive(Serialize)]
struct ThumbnailReport {
    encoding: String,
    size: usize,
    data: String,
}

fn show_info(path: &Path, options: LoadOptions, json: bool) -> Result<(), String> {
    let book = Book::open(path, options).map_err(|e| e.to_string())?;
    let header = book.header();
    let fields = book
        .doc_info()
        .fields()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|(field, value)| (field.element().to_string(), value))
        .collect::<Vec<_>>();

    if json {
        return print_json(&InfoReport {
            file: path.display().to_string(),
            version: header.version,
            objects: header.object_count,
            screen: (header.width, header.height),
            dpi: header.dpi,
            fields,
            thumbnail: book.cover_thumbnail().map(|t| ThumbnailReport {
                encoding: format!("{:?}", t.encoding),
                size: t.data.len(),
                data: BASE64.encode(&t.data),
            }),
        });
    }

    println!("File: {}", path.display());
    println!("Version: {}", header.version);
    println!("Objects: {}", header.object_count);
    println!("Screen: {}x{} at {} dpi", header.width, header.height, header.dpi / 10);
    for (name, value) in &fields {
        if !value.is_empty() {
            println!("{name}: {value}");
        }
    }
    if let Some(thumb) = book.cover_thumbnail() {
        println!("Thumbnail: {:?}, {} bytes", thumb.encoding, thumb.data.len());
    }
    println!("TOC entries: {}", book.toc().len());
    Ok(())
}

#[derive(Serialize)]
struct ObjectReport {
    id: u32,
    kind: &'static str,
    attrs: Vec<(String, String)>,
    stream: usize,
    references: Vec<u32>,
}

fn dump(path: &Path, options: LoadOptions, json: bool) -> Result<(), String> {
    let book = Book::open(path, options).map_err(|e| e.to_string())?;
    let reports = book
        .objects()
        .iter()
        .map(|object| ObjectReport {
            id: object.id,
            kind: object.kind.name(),
            attrs: object
                .attrs
                .iter()
                .map(|(tag, value)| (lrfkit::lrf::tags::tag_name(tag), format!("{value:?}")))
                .collect(),
            stream: object.stream_bytes().len(),
            references: object.references().to_vec(),
        })
        .collect::<Vec<_>>();
    if json {
        return print_json(&reports);
    }
    for report in reports {
        println!("{} {}", report.kind, report.id);
        for (name, value) in &report.attrs {
            println!("    {name} = {value}");
        }
        if report.stream > 0 {
            println!("    <stream {} bytes>", report.stream);
        }
    }
    Ok(())
}

fn layout_config(book: &Book, args: &LayoutArgs) -> LayoutConfig {
    let mut config = LayoutConfig::for_book(book);
    if args.dpi.is_some() {
        config.dpi = args.dpi;
    }
    if let Some((w, h)) = config.screen {
        config.screen = Some((args.width.unwrap_or(w), args.height.unwrap_or(h)));
    }
    config
}

#[derive(Serialize)]
struct TocReport {
    label: String,
    page: u32,
    object: u32,
    page_number: Option<usize>,
}

fn show_toc(path: &Path, options: LoadOptions, args: &LayoutArgs, json: bool) -> Result<(), String> {
    let book = Book::open(path, options).map_err(|e| e.to_string())?;
    let config = layout_config(&book, args);
    let pagination = book.paginate(&config, &MonospaceMeasurer).map_err(|e| e.to_string())?;
    let map = PageMap::from_pagination(&pagination);
    let entries = book
        .toc()
        .into_iter()
        .map(|entry| TocReport {
            page_number: map.resolve(&entry),
            label: entry.label,
            page: entry.page,
            object: entry.object,
        })
        .collect::<Vec<_>>();
    if json {
        return print_json(&entries);
    }
    for entry in entries {
        let number = entry.page_number.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        let label = if entry.label.is_empty() {
            format!("(page object {})", entry.page)
        } else {
            entry.label
        };
        println!("{number:>5}  {label}");
    }
    Ok(())
}

#[derive(Serialize)]
struct PageReport {
    number: usize,
    chapter: usize,
    source: u32,
    fragments: usize,
    links: usize,
    used_height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn show_pages(path: &Path, options: LoadOptions, args: &LayoutArgs, text: bool, json: bool) -> Result<(), String> {
    let book = Book::open(path, options).map_err(|e| e.to_string())?;
    let config = layout_config(&book, args);
    let provider = FixedPitchProvider::default();
    book.register_fonts(&provider).map_err(|e| e.to_string())?;
    let measurer = FontMeasurer::new(FontCache::new(&provider, config.default_families.clone()));
    let pagination = book.paginate(&config, &measurer).map_err(|e| e.to_string())?;

    let reports = pagination
        .pages
        .iter()
        .map(|page| PageReport {
            number: page.number,
            chapter: page.chapter,
            source: page.source,
            fragments: page.fragments.len(),
            links: page.link_map.len(),
            used_height: page.used_height,
            text: text.then(|| page.text()),
        })
        .collect::<Vec<_>>();
    if json {
        return print_json(&reports);
    }
    println!(
        "{} pages in {} chapters, {} styles",
        pagination.total_pages(),
        pagination.chapters.len(),
        pagination.styles.len()
    );
    for report in reports {
        println!(
            "page {:>4}  chapter {:>3}  source {:>6}  {:>4} fragments  {:>2} links  {:>4}px",
            report.number, report.chapter, report.source, report.fragments, report.links, report.used_height
        );
        if let Some(text) = report.text {
            for line in text.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}

fn set_meta(args: &SetMetaArgs, options: LoadOptions) -> Result<(), String> {
    let mut book = Book::open(&args.input, options).map_err(|e| e.to_string())?;
    if let Some(title) = &args.title {
        book.set_title(title).map_err(|e| e.to_string())?;
    }
    if !args.authors.is_empty() {
        book.set_authors(&args.authors).map_err(|e| e.to_string())?;
    }
    for field in &args.fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got {field:?}"))?;
        let info = InfoField::from_element(name.trim()).ok_or_else(|| format!("unknown DocInfo field {name:?}"))?;
        book.set_info(info, value).map_err(|e| e.to_string())?;
    }
    if let Some(cover) = &args.cover {
        let data = std::fs::read(cover).map_err(|e| format!("{}: {e}", cover.display()))?;
        let encoding = match ImageEncoding::sniff(&data) {
            ImageEncoding::Unknown(_) => return Err(format!("{}: not a JPEG, PNG, BMP or GIF", cover.display())),
            known => known,
        };
        book.set_cover(encoding, data);
    }
    let output = args.output.as_deref().unwrap_or(&args.input);
    book.write_metadata(output).map_err(|e| e.to_string())?;
    tracing::info!(output = %output.display(), "metadata written");
    Ok(())
}
