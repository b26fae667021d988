// Cases for NO_STDIO_PRINT

fn bad_print(stage: &str) {
    print!("entering {}", stage);
    println!("entering {}", stage);
}

fn bad_eprint(stage: &str) {
    eprint!("stage {} failed", stage);
    eprintln!("stage {} failed", stage);
}

fn bad_dbg() {
    let payload = vec![1, 2, 3];
    dbg!(&payload);
}

// Good: structured logging
fn good_tracing(stage: &str) {
    tracing::debug!(stage, "entering stage");
}

fn main() {
    bad_print("auth");
    bad_eprint("auth");
    bad_dbg();
    good_tracing("auth");
}
