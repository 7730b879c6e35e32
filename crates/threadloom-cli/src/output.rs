use colored::Colorize;

pub fn print_info(msg: &str) {
    println!("{} {}", "i".bright_blue().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "ERROR:".bright_red().bold(), msg);
}
