//! A line-based REPL over the core emulator (§6.4). Reads an optional
//! assembly source file named on the command line, loads it, then reads
//! further lines from stdin: each accepted assembly line is executed
//! immediately via `execute_line`; a handful of debugger commands
//! (`?`, `reg`, `stack`, `mem`) inspect state instead of executing
//! anything; `exit`/`quit` ends the session. Errors are printed and the
//! REPL keeps reading rather than aborting, matching the propagation
//! policy in §7.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::exit;

use asm8086::debug;
use asm8086::machine::Machine;

const HELP: &str = "\
commands:
  ?                    show this help
  reg                  dump the register file and flags
  stack                dump the stack (top of stack first)
  mem <addr-hex> <n>   dump <n> bytes starting at <addr-hex>
  exit | quit          leave the REPL
anything else is executed as one assembly instruction.";

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut machine = Machine::with_default_memory();

    if let Some(path) = args.get(1) {
        match fs::read_to_string(path) {
            Ok(src) => {
                let lines: Vec<String> = src.lines().map(|l| l.to_string()).collect();
                if let Err(e) = machine.load_program(&lines) {
                    eprintln!("failed to load {}: {}", path, e);
                    exit(1);
                }
                println!("loaded {} ({} instructions)", path, machine.program().len());
            }
            Err(e) => {
                eprintln!("failed to read {}: {}", path, e);
                exit(1);
            }
        }
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush().ok();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        match trimmed {
            "" => {}
            "?" | "help" => println!("{}", HELP),
            "exit" | "quit" => {
                exit(0);
            }
            "reg" => print_registers(&machine),
            "stack" => print_stack(&machine),
            _ if trimmed.starts_with("mem ") => print_memory(&machine, trimmed),
            _ => {
                if let Err(e) = machine.execute_line(trimmed) {
                    println!("error: {}", e);
                }
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }
}

fn print_registers(m: &Machine) {
    let r = debug::registers(m);
    println!(
        "AX={:04X} BX={:04X} CX={:04X} DX={:04X} SI={:04X} DI={:04X} BP={:04X} SP={:04X}",
        r.ax, r.bx, r.cx, r.dx, r.si, r.di, r.bp, r.sp
    );
    println!(
        "CS={:04X} DS={:04X} ES={:04X} SS={:04X} IP={:04X} FLAGS={:04X}",
        r.cs, r.ds, r.es, r.ss, r.ip, r.flags
    );
}

fn print_stack(m: &Machine) {
    match debug::stack_window(m) {
        Ok(words) => {
            for (i, w) in words.iter().enumerate() {
                println!("[{}] {:04X}", i, w);
            }
            if words.is_empty() {
                println!("(empty)");
            }
        }
        Err(e) => println!("error: {}", e),
    }
}

fn print_memory(m: &Machine, line: &str) {
    let mut parts = line.split_whitespace().skip(1);
    let addr = parts.next().and_then(|s| u32::from_str_radix(s, 16).ok());
    let count = parts.next().and_then(|s| usize::from_str_radix(s, 16).ok());
    match (addr, count) {
        (Some(addr), Some(count)) => match debug::memory_window(m, addr, count) {
            Ok(bytes) => {
                for (i, chunk) in bytes.chunks(16).enumerate() {
                    let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
                    println!("{:06X}: {}", addr as usize + i * 16, hex.join(" "));
                }
            }
            Err(e) => println!("error: {}", e),
        },
        _ => println!("usage: mem <addr-hex> <count-hex>"),
    }
}
