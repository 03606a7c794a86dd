use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

fn ansi(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(ansi(AnsiColor::Cyan).bold().underline())
        .header(ansi(AnsiColor::Cyan).bold().underline())
        .literal(ansi(AnsiColor::Green).bold())
        .invalid(ansi(AnsiColor::Red).bold())
        .error(ansi(AnsiColor::Red).bold())
        .valid(ansi(AnsiColor::Green).bold())
        .placeholder(ansi(AnsiColor::BrightBlack))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    pub const TEAL: Color = rgb(0, 200, 200);
    pub const AMBER: Color = rgb(255, 191, 0);
    pub const GREEN: Color = rgb(0, 230, 118);
    pub const RED: Color = rgb(255, 85, 85);
    pub const DIM: Color = rgb(128, 128, 128);
    pub const WHITE: Color = rgb(255, 255, 255);
}

mod box_chars {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const BULLET: &str = "●";
    pub const DIAMOND: &str = "◆";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 60;

pub fn print_banner(settings_path: &str) {
    println!();
    println!(
        "  {} {}",
        box_chars::DIAMOND.with(colors::AMBER),
        "CATALOG MANAGER SETTINGS".with(colors::TEAL).bold()
    );
    println!(
        "    {} {}",
        "settings:".with(colors::DIM),
        settings_path.with(colors::WHITE)
    );
    println!(
        "    {}",
        "Type 'help' for available commands"
            .with(colors::DIM)
            .attribute(Attribute::Italic)
    );
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::AMBER).bold(),
        message.with(colors::AMBER)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;

    println!();
    print!("{}", box_chars::ROUND_TOP_LEFT.with(colors::TEAL));
    print!("{}", box_chars::HORIZONTAL.repeat(padding).with(colors::TEAL));
    print!(" {} ", title.with(colors::TEAL).bold());
    print!(
        "{}",
        box_chars::HORIZONTAL
            .repeat(SECTION_WIDTH.saturating_sub(title_len + 4 + padding))
            .with(colors::TEAL)
    );
    println!("{}", box_chars::ROUND_TOP_RIGHT.with(colors::TEAL));
}

pub fn print_section_footer() {
    print!("{}", box_chars::ROUND_BOTTOM_LEFT.with(colors::TEAL));
    print!(
        "{}",
        box_chars::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::TEAL)
    );
    println!("{}", box_chars::ROUND_BOTTOM_RIGHT.with(colors::TEAL));
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::TEAL),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

/// Same as [`print_key_value`], for values that differ from what is saved.
pub fn print_key_value_highlight(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::DIAMOND.with(colors::AMBER),
        format!("{}:", key).with(colors::AMBER).bold(),
        value.with(colors::GREEN).bold()
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row);
    }

    fn print_border(&self, left: &str, junction: &str, right: &str) {
        print!("{}", left.with(colors::TEAL));
        for (i, width) in self.col_widths.iter().enumerate() {
            print!("{}", box_chars::HORIZONTAL.repeat(width + 2).with(colors::TEAL));
            if i < self.col_widths.len() - 1 {
                print!("{}", junction.with(colors::TEAL));
            }
        }
        println!("{}", right.with(colors::TEAL));
    }

    fn print_cells(&self, cells: &[String], header: bool) {
        print!("{}", box_chars::VERTICAL.with(colors::TEAL));
        for (i, cell) in cells.iter().enumerate() {
            let width = self.col_widths.get(i).copied().unwrap_or(0);
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if header {
                print!(" {}{} ", cell.clone().with(colors::TEAL).bold(), padding);
            } else {
                print!(" {}{} ", cell.clone().with(colors::WHITE), padding);
            }
            print!("{}", box_chars::VERTICAL.with(colors::TEAL));
        }
        println!();
    }

    pub fn print(&self) {
        if self.col_widths.is_empty() {
            return;
        }
        self.print_border(
            box_chars::ROUND_TOP_LEFT,
            box_chars::T_TOP,
            box_chars::ROUND_TOP_RIGHT,
        );
        self.print_cells(&self.headers, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_cells(row, false);
        }
        self.print_border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prompt
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_prompt() -> String {
    format!(
        "{}{} ",
        "catalog".with(colors::TEAL).bold(),
        "❯".with(colors::AMBER).bold(),
    )
}

pub fn print_command_echo(command: &str) {
    println!(
        "{}  {}",
        "❯".with(colors::AMBER).bold(),
        command.with(colors::GREEN).bold()
    );
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Bye.".with(colors::TEAL).bold());
    println!();
}
