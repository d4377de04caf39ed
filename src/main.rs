mod extract;
mod gemini;
mod html;
mod record;
mod session;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use extract::Source;
use record::{AttrField, AttrId, ProductRecord};
use session::Session;

/// Generic user-facing extraction failure message; detail goes to the log.
const EXTRACT_ERROR: &str = "Không thể tìm kiếm thông tin. Vui lòng thử lại chi tiết hơn.";
const RESET_CONFIRM: &str = "Bạn có chắc chắn muốn xóa hết dữ liệu không? [y/N] ";

#[derive(Parser)]
#[command(
    name = "listing_gen",
    about = "Product listing HTML generator with AI-assisted field extraction"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive editing session
    Edit {
        /// Start from a record JSON file instead of the default seed
        #[arg(short, long)]
        load: Option<PathBuf>,
    },
    /// One-shot: extract fields from raw text and print the resulting HTML
    Extract {
        /// Raw product description (e.g. "Solo Leveling tập 2")
        text: Vec<String>,
    },
    /// Serialize a record JSON file (or stdin) to listing HTML
    Render {
        /// Record JSON file; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit { load } => {
            let record = match load {
                Some(path) => load_record(&path)?,
                None => ProductRecord::default(),
            };
            run_editor(Session::with_record(record)).await
        }
        Commands::Extract { text } => {
            let text = text.join(" ");
            let client = gemini::GeminiClient::from_env()?;
            let mut session = Session::new();
            session.begin_extraction()?;
            let pb = spinner("Đang tìm kiếm thông tin...");
            let result = client.extract_product(&text).await;
            pb.finish_and_clear();
            match session.finish_extraction(result) {
                Ok(()) => {
                    println!("{}", session.html());
                    print_sources(session.sources());
                    Ok(())
                }
                Err(e) => {
                    warn!("Extraction failed: {:#}", e);
                    bail!("{}", EXTRACT_ERROR);
                }
            }
        }
        Commands::Render { file } => {
            let record = match file {
                Some(path) => load_record(&path)?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read record JSON from stdin")?;
                    serde_json::from_str(&buf).context("Stdin is not a valid record JSON")?
                }
            };
            println!("{}", html::render(&record));
            Ok(())
        }
    }
}

async fn run_editor(mut session: Session) -> Result<()> {
    // Built lazily so pure editing works without GEMINI_API_KEY.
    let mut client: Option<gemini::GeminiClient> = None;

    println!("Tạo Mã Sản Phẩm - gõ 'help' để xem lệnh, 'quit' để thoát.");
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = split_first(line);
        match cmd {
            "quit" | "exit" => break,
            "help" => print_help(),
            "sku" => {
                session.set_sku(rest);
                println!("Mã Hàng = {:?}", rest);
            }
            "info" => {
                session.set_additional_info(&unescape_newlines(rest));
                println!("Đã cập nhật thông tin thêm.");
            }
            "add" => {
                let id = session.add_attribute();
                println!("Đã thêm dòng {} (trống).", id);
            }
            "set" => match parse_set(rest) {
                Some((id, field, value)) => {
                    if session.update_attribute(id, field, value) {
                        println!("Đã cập nhật dòng {}.", id);
                    } else {
                        println!("Không có dòng với id {}.", id);
                    }
                }
                None => println!("Cú pháp: set <id> label|value <nội dung>"),
            },
            "del" => match rest.parse::<AttrId>() {
                Ok(id) => {
                    if session.remove_attribute(id) {
                        println!("Đã xóa dòng {}.", id);
                    } else {
                        println!("Không có dòng với id {}.", id);
                    }
                }
                Err(_) => println!("Cú pháp: del <id>"),
            },
            "show" => print_record(session.record()),
            "html" => println!("{}", session.html()),
            "extract" => run_extract(&mut session, &mut client, rest).await,
            "reset" => {
                if confirm(RESET_CONFIRM)? {
                    session.reset();
                    println!("Đã làm mới về dữ liệu mặc định.");
                } else {
                    println!("Đã hủy.");
                }
            }
            "save" => {
                if rest.is_empty() {
                    println!("Cú pháp: save <file>");
                } else {
                    save_record(session.record(), Path::new(rest))?;
                    println!("Đã lưu {}.", rest);
                }
            }
            _ => println!("Lệnh không hợp lệ: {:?} (gõ 'help').", cmd),
        }
    }
    Ok(())
}

/// One extraction round inside the editor. All failure modes are reported to
/// the user here; the network path only ever shows the generic message, the
/// detail goes to the log.
async fn run_extract(
    session: &mut Session,
    client: &mut Option<gemini::GeminiClient>,
    text: &str,
) {
    let text = text.trim();
    if text.is_empty() {
        println!("Cú pháp: extract <mô tả sản phẩm>");
        return;
    }
    if let Err(e) = session.begin_extraction() {
        println!("{}", e);
        return;
    }

    let result = match ensure_client(client) {
        Ok(c) => {
            let pb = spinner("Đang tìm kiếm thông tin...");
            let r = c.extract_product(text).await;
            pb.finish_and_clear();
            r
        }
        Err(e) => Err(e),
    };

    match session.finish_extraction(result) {
        Ok(()) => {
            println!("Đã cập nhật thông tin sản phẩm.");
            print_sources(session.sources());
        }
        Err(e) => {
            warn!("Extraction failed: {:#}", e);
            println!("{}", EXTRACT_ERROR);
        }
    }
}

fn ensure_client(client: &mut Option<gemini::GeminiClient>) -> Result<&gemini::GeminiClient> {
    if client.is_none() {
        *client = Some(gemini::GeminiClient::from_env()?);
    }
    match client {
        Some(c) => Ok(c),
        None => bail!("Gemini client unavailable"),
    }
}

fn load_record(path: &Path) -> Result<ProductRecord> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("{} is not a valid record JSON", path.display()))
}

fn save_record(record: &ProductRecord, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_record(record: &ProductRecord) {
    println!("{:>4} | {:<24} | {}", "id", "Nhãn", "Giá trị");
    println!("{}", "-".repeat(60));
    println!("{:>4} | {:<24} | {}", "-", "Mã Hàng", record.sku);
    for a in &record.attributes {
        println!("{:>4} | {:<24} | {}", a.id, a.label, a.value);
    }
    if !record.additional_info.is_empty() {
        println!("\nThông tin thêm:\n{}", record.additional_info);
    }
}

fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    println!("Nguồn thông tin:");
    for s in sources {
        // Long titles are shortened for display only.
        println!("  {} ({})", truncate(&s.title, 20), s.uri);
    }
}

fn print_help() {
    println!(
        "Lệnh:\n\
         \x20 sku <mã>                  đặt Mã Hàng\n\
         \x20 info <văn bản>            đặt thông tin thêm (dùng \\n để xuống dòng)\n\
         \x20 add                       thêm một dòng thông số trống\n\
         \x20 set <id> label|value <x>  sửa nhãn hoặc giá trị của một dòng\n\
         \x20 del <id>                  xóa một dòng\n\
         \x20 show                      xem bảng thông số hiện tại\n\
         \x20 html                      in HTML hiện tại\n\
         \x20 extract <mô tả>           tìm kiếm & điền tự động (AI)\n\
         \x20 reset                     làm mới về dữ liệu mặc định\n\
         \x20 save <file>               lưu bản ghi ra JSON\n\
         \x20 quit                      thoát"
    );
}

fn split_first(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}

fn parse_set(rest: &str) -> Option<(AttrId, AttrField, &str)> {
    let (id_str, rest) = split_first(rest);
    let id = id_str.parse().ok()?;
    let (field_str, value) = split_first(rest);
    let field = match field_str {
        "label" => AttrField::Label,
        "value" => AttrField::Value,
        _ => return None,
    };
    Some((id, field, value))
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──
