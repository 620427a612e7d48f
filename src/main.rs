use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use resx_editor::designer::{AccessorEmitter, DesignerFileEmitter};
use resx_editor::resx::{self, LineEnding, WriteOptions};
use resx_editor::utils::create_backup;
use resx_editor::{
    logging, Column, DocumentId, EditorConfig, EditorOutput, FileDocument, GridState, InboundMessage, LogLevel,
    Notification, ResxEditor, Session, TextDocument, SUPPORTED_EXTENSIONS,
};

#[derive(Parser)]
#[command(name = "resx_editor")]
#[command(about = "View and edit .resx string resources")]
#[command(version)]
struct Cli {
    /// Input .resx file
    #[arg(short, long)]
    input: PathBuf,

    /// List resources as a table
    #[arg(long)]
    list: bool,

    /// Sort the listing by column (key, value or comment)
    #[arg(long, requires = "list")]
    sort: Option<Column>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Show resource statistics
    #[arg(long)]
    stats: bool,

    /// Add a resource
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    add: Option<Vec<String>>,

    /// Comment for --add / --set
    #[arg(long)]
    comment: Option<String>,

    /// Change the value of an existing resource
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    set: Option<Vec<String>>,

    /// Delete a resource
    #[arg(long, value_name = "KEY")]
    delete: Option<String>,

    /// Rewrite the file in canonical form
    #[arg(long)]
    format: bool,

    /// Generate the .Designer.cs accessor class
    #[arg(long)]
    generate: bool,

    /// Back up the file before modifying it
    #[arg(long)]
    backup: bool,

    /// Settings JSON file (enableColumnSorting, generateCode, loggingLevel)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logging level (off, error, warn, info, verbose)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Speak the editor protocol as JSON lines on stdin/stdout
    #[arg(long)]
    serve: bool,

    /// Quiet mode (errors only)
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EditorConfig::load_or_default(cli.config.as_deref())
        .with_context(|| format!("failed to load settings from {:?}", cli.config))?;
    if let Some(level) = cli.log_level {
        config.logging_level = level;
    } else if cli.quiet {
        config.logging_level = LogLevel::Error;
    }
    logging::init(config.logging_level);

    validate_input(&cli)?;

    if cli.serve {
        return handle_serve(&cli, config);
    }

    if cli.backup && cli.input.exists() && is_modifying(&cli) {
        let backup = create_backup(&cli.input)?;
        if !cli.quiet {
            println!("Backup written to {:?}", backup);
        }
    }

    if let Some(args) = &cli.add {
        return handle_add(&cli, config, &args[0], &args[1]);
    }

    if let Some(args) = &cli.set {
        return handle_set(&cli, config, &args[0], &args[1]);
    }

    if let Some(key) = &cli.delete {
        return handle_delete(&cli, config, key);
    }

    if cli.format {
        return handle_format(&cli);
    }

    if cli.generate {
        return handle_generate(&cli);
    }

    if cli.stats {
        return handle_stats(&cli);
    }

    // 默认模式：列出资源
    handle_list(&cli, &config)
}

/// 验证输入文件
fn validate_input(cli: &Cli) -> Result<()> {
    let extension = cli.input.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        bail!("input file must be a .resx file");
    }

    // 新增资源与服务模式允许文件尚不存在
    if !cli.input.exists() && cli.add.is_none() && !cli.serve {
        bail!("input file does not exist: {:?}", cli.input);
    }

    Ok(())
}

fn is_modifying(cli: &Cli) -> bool {
    cli.add.is_some() || cli.set.is_some() || cli.delete.is_some() || cli.format
}

/// 打开编辑器并把文档内容加载进表格
fn open_grid(cli: &Cli, config: EditorConfig) -> Result<(ResxEditor<FileDocument>, GridState)> {
    let mut editor = ResxEditor::new(FileDocument::new(&cli.input), config);
    let mut grid = GridState::new(editor.config().enable_column_sorting);

    let output = editor.open();
    fail_on_notification(&output)?;
    for message in output.messages {
        grid.handle(message)?;
    }

    Ok((editor, grid))
}

/// 命令行模式下通知即失败
fn fail_on_notification(output: &EditorOutput) -> Result<()> {
    match output.notifications.first() {
        Some(notification) => Err(anyhow!("{}", notification.message)),
        None => Ok(()),
    }
}

/// 把表格回写交给编辑器
fn commit(cli: &Cli, editor: &mut ResxEditor<FileDocument>, sync: InboundMessage) -> Result<()> {
    let output = editor.handle_message(sync);
    fail_on_notification(&output)?;

    if !cli.quiet {
        if output.document_written {
            println!("Saved {:?}", cli.input);
        } else {
            println!("No changes to {:?}", cli.input);
        }
    }
    Ok(())
}

fn row_of(grid: &GridState, key: &str) -> Result<usize> {
    grid.rows()
        .iter()
        .position(|row| row.key == key)
        .ok_or_else(|| anyhow!("no resource with the key '{}'", key))
}

fn handle_add(cli: &Cli, config: EditorConfig, key: &str, value: &str) -> Result<()> {
    let (mut editor, mut grid) = open_grid(cli, config)?;
    let comment = cli.comment.as_deref().unwrap_or_default();

    let request = editor.request_add(key, value, comment);
    fail_on_notification(&request)?;

    for message in request.messages {
        if let Some(sync) = grid.handle(message)? {
            commit(cli, &mut editor, sync)?;
        }
    }
    Ok(())
}

fn handle_set(cli: &Cli, config: EditorConfig, key: &str, value: &str) -> Result<()> {
    let (mut editor, mut grid) = open_grid(cli, config)?;
    let row = row_of(&grid, key)?;

    let mut pending = grid.edit(row, Column::Value, value)?;
    if let Some(comment) = &cli.comment {
        pending = grid.edit(row, Column::Comment, comment)?.or(pending);
    }

    match pending {
        Some(sync) => commit(cli, &mut editor, sync),
        None => {
            if !cli.quiet {
                println!("'{}' is unchanged", key);
            }
            Ok(())
        }
    }
}

fn handle_delete(cli: &Cli, config: EditorConfig, key: &str) -> Result<()> {
    let (mut editor, mut grid) = open_grid(cli, config)?;
    let row = row_of(&grid, key)?;

    grid.select(Some(row))?;
    let request = editor.request_delete();
    for message in request.messages {
        if let Some(sync) = grid.handle(message)? {
            commit(cli, &mut editor, sync)?;
        }
    }
    Ok(())
}

fn handle_format(cli: &Cli) -> Result<()> {
    let mut document = FileDocument::new(&cli.input);
    let text = document.get_text()?;
    let normalized = resx::normalize(&text)?;

    if normalized == text {
        if !cli.quiet {
            println!("{:?} is already canonical", cli.input);
        }
        return Ok(());
    }

    document.apply_edit(&normalized)?;
    if !cli.quiet {
        println!("Formatted {:?}", cli.input);
    }
    Ok(())
}

fn handle_generate(cli: &Cli) -> Result<()> {
    let text = FileDocument::new(&cli.input).get_text()?;
    let set = resx::parse(&text)?;

    let path = DesignerFileEmitter::new(&cli.input).emit(&set)?;
    if !cli.quiet {
        println!("Generated {:?} ({} resources)", path, set.len());
    }
    Ok(())
}

fn handle_stats(cli: &Cli) -> Result<()> {
    let text = FileDocument::new(&cli.input).get_text()?;
    let set = resx::parse(&text)?;
    let options = WriteOptions::detect(&text);

    let commented = set.iter().filter(|e| e.has_comment()).count();
    let empty = set.iter().filter(|e| e.value.is_empty()).count();

    println!("File: {:?}", cli.input);
    println!("  String resources: {}", set.len());
    println!("  With comments:    {}", commented);
    println!("  Empty values:     {}", empty);
    println!("  Other nodes:      {}", set.opaque().len());
    println!("  Line endings:     {}", match options.line_ending {
        LineEnding::Lf => "LF",
        LineEnding::CrLf => "CRLF",
    });
    println!("  Canonical:        {}", if resx::is_canonical(&text) { "yes" } else { "no" });

    Ok(())
}

fn handle_list(cli: &Cli, config: &EditorConfig) -> Result<()> {
    let text = FileDocument::new(&cli.input).get_text()?;
    let set = resx::parse(&text)?;

    let mut grid = GridState::new(config.enable_column_sorting);
    grid.replace(&set.to_transport_json()?)?;

    if let Some(column) = cli.sort {
        if !config.enable_column_sorting {
            bail!("column sorting is disabled in the settings");
        }
        grid.click_header(column);
        if cli.desc {
            grid.click_header(column);
        }
    }

    let rows = grid.displayed_rows();
    let key_width = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(0).max(3);
    let value_width = rows.iter().map(|r| preview(&r.value).chars().count()).max().unwrap_or(0).max(5);

    let indicator = |column: Column| grid.sort().indicator(column).unwrap_or("");
    println!(
        "{:<kw$}  {:<vw$}  {}",
        format!("{}{}", Column::Key.title(), indicator(Column::Key)),
        format!("{}{}", Column::Value.title(), indicator(Column::Value)),
        format!("{}{}", Column::Comment.title(), indicator(Column::Comment)),
        kw = key_width + 1,
        vw = value_width + 1,
    );
    for row in &rows {
        println!(
            "{:<kw$}  {:<vw$}  {}",
            row.key,
            preview(&row.value),
            preview(&row.comment),
            kw = key_width + 1,
            vw = value_width + 1,
        );
    }

    if !cli.quiet {
        println!("\n{} resources", rows.len());
    }
    Ok(())
}

/// 单行预览（过长时截断）
fn preview(text: &str) -> String {
    let single_line = text.replace(['\r', '\n'], " ");
    if single_line.chars().count() > 50 {
        format!("{}...", single_line.chars().take(50).collect::<String>())
    } else {
        single_line
    }
}

/// 服务模式的请求
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServeRequest {
    /// 表格回写
    Update { json: String },
    /// 新增资源命令
    AddResource {
        key: String,
        value: String,
        #[serde(default)]
        comment: String,
    },
    /// 删除资源命令
    DeleteResource,
    /// 文档在外部被修改
    Reload,
    /// 关闭编辑器
    Close,
}

fn handle_serve(cli: &Cli, config: EditorConfig) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let editor = ResxEditor::new(FileDocument::new(&cli.input), config);
    let id = editor.id().clone();

    let mut session = Session::new();
    let opened = session.open(editor);
    emit(&mut stdout, &opened)?;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        if line.trim().is_empty() {
            continue;
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            serve_one(&mut session, &id, &line)
        }));

        let output = match result {
            Ok(Some(output)) => output,
            Ok(None) => break,
            Err(_) => {
                tracing::error!("handler panicked while processing a message");
                EditorOutput {
                    notifications: vec![Notification::error("An unexpected error occurred. See the output log for details.")],
                    ..EditorOutput::default()
                }
            }
        };

        if emit(&mut stdout, &output).is_err() {
            break;
        }
    }

    Ok(())
}

/// 处理一行请求；`None` 表示会话结束
fn serve_one(session: &mut Session<FileDocument>, id: &DocumentId, line: &str) -> Option<EditorOutput> {
    let request: ServeRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("invalid request: {}", e);
            return Some(EditorOutput {
                notifications: vec![Notification::error("Invalid message.")],
                ..EditorOutput::default()
            });
        }
    };

    let output = match request {
        ServeRequest::Update { json } => session.handle_message(id, InboundMessage::Update { json }),
        ServeRequest::AddResource { key, value, comment } => session
            .get_mut(id)
            .map(|editor| editor.request_add(&key, &value, &comment))
            .unwrap_or_default(),
        ServeRequest::DeleteResource => session
            .get_mut(id)
            .map(|editor| editor.request_delete())
            .unwrap_or_default(),
        ServeRequest::Reload => {
            let mut output = EditorOutput::default();
            for (_, changed) in session.document_changed(id) {
                output.extend(changed);
            }
            output
        }
        ServeRequest::Close => {
            session.close(id);
            return None;
        }
    };

    Some(output)
}

/// 输出消息与通知，每行一条 JSON
fn emit(out: &mut impl Write, output: &EditorOutput) -> Result<()> {
    for message in &output.messages {
        writeln!(out, "{}", message.to_json()?)?;
    }
    for notification in &output.notifications {
        let line = serde_json::json!({
            "type": "notify",
            "level": notification.level,
            "message": notification.message,
        });
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}
