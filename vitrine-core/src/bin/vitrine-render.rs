use std::env;
use std::fs;
use std::process;
use vitrine_core::{capture, HostEvent, IsolationHost, ScopeConfig};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: vitrine-render <file.luax> [-o out.png] [--selector SEL]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  vitrine-render hello.luax");
        eprintln!("  vitrine-render hello.luax -o hello.png --selector '#submit'");
        process::exit(1);
    }

    let mut input: Option<String> = None;
    let mut output = "artifact.png".to_string();
    let mut selector: Option<String> = None;

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--out" => match iter.next() {
                Some(path) => output = path.clone(),
                None => exit_usage("missing path after -o"),
            },
            "--selector" => match iter.next() {
                Some(sel) => selector = Some(sel.clone()),
                None => exit_usage("missing selector after --selector"),
            },
            other => input = Some(other.to_string()),
        }
    }

    let Some(input) = input else {
        exit_usage("missing input file");
    };
    let code = match fs::read_to_string(&input) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ failed to read {input}: {e}");
            process::exit(1);
        }
    };

    let mut host = IsolationHost::new(ScopeConfig::default());
    match host.load_code(&code) {
        HostEvent::RenderSuccess => {}
        HostEvent::RenderError { message } => {
            eprintln!("✗ {input} failed to render:");
            eprintln!("  {message}");
            process::exit(1);
        }
        other => {
            eprintln!("✗ unexpected host event: {other:?}");
            process::exit(1);
        }
    }

    let root = host.mounted().unwrap_or_else(|| {
        eprintln!("✗ render succeeded but nothing is mounted");
        process::exit(1);
    });
    let target = match capture::resolve_target(root, selector.as_deref()) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("✗ capture failed: {e}");
            process::exit(1);
        }
    };
    match capture::capture_png(target) {
        Ok(png) => {
            if let Err(e) = fs::write(&output, &png) {
                eprintln!("✗ failed to write {output}: {e}");
                process::exit(1);
            }
            println!("✓ {input} -> {output}");
        }
        Err(e) => {
            eprintln!("✗ capture failed: {e}");
            process::exit(1);
        }
    }
}

fn exit_usage(message: &str) -> ! {
    eprintln!("✗ {message}");
    process::exit(1);
}
