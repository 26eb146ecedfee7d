use clap::Parser;
use docqa_context::text::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextChunker};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk a text document into JSON output using docqa-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source name used to derive chunk ids. Defaults to the input file name.
    #[arg(short, long)]
    source: Option<String>,

    /// Target chunk size in characters.
    #[arg(short = 'c', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,
}

#[derive(Serialize)]
struct SerializableChunk<'a> {
    chunk_id: String,
    source: &'a str,
    start: usize,
    end: usize,
    text: &'a str,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = &args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let source = args
        .source
        .clone()
        .or_else(|| {
            args.input.as_deref().and_then(|p| {
                std::path::Path::new(p)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
        })
        .unwrap_or_else(|| "stdin".to_string());

    let chunker = TextChunker::new(args.chunk_size, args.overlap);
    let serializable_chunks: Vec<SerializableChunk> = chunker
        .get_chunks(&file_content)
        .into_iter()
        .map(|c| SerializableChunk {
            chunk_id: format!("{}_chunk_{}", source, c.sequence),
            source: &source,
            start: c.span.start,
            end: c.span.end,
            text: c.chunk_text,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&serializable_chunks)?;
    println!("{}", json_output);

    Ok(())
}
