//! Status page renderer.
//!
//! Pure function of the port table and the display configuration: identical
//! inputs always give byte-identical output. The page carries a refresh hint so
//! a plain browser re-polls without any client action.

use crate::display::{DisplayConfig, DisplayFlag};
use crate::table::{Level, Line, LineState, PortTable};

/// Auto-refresh interval embedded in the page
pub const REFRESH_SECONDS: u32 = 60;

/// Slider step in percent
const SLIDER_STEP: u32 = 5;

const CSS_STYLES: &str = r#"
table {font-family: courier; font-size: 20px; border-collapse: collapse; width: 100%;}
button {width: 60px; height: 30px; font-size: 16px; font-weight: bold; text-align: center; border-radius: 8px;}
td, th {border: 1px solid #dddddd; text-align: left; padding: 8px;}
tr:nth-child(even) {background-color: #dddddd;}
"#;

/// Render the full status document
pub fn render_status_page(table: &PortTable, display: &DisplayConfig) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(&generate_header(display));
    html.push_str(&generate_controls(display));
    html.push_str(&generate_line_table(table, display));
    html.push_str(&generate_footer(display));
    html
}

fn generate_header(display: &DisplayConfig) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>{} - {}</title><style>{}</style><meta http-equiv="refresh" content="{}"></head>
"#,
        escape_html(&display.board),
        escape_html(&display.mode),
        CSS_STYLES,
        REFRESH_SECONDS
    )
}

fn generate_controls(display: &DisplayConfig) -> String {
    let mut html = format!(
        "<body><a href=\"/\"><button>Home</button></a>\n<h2>{} - {}</h2>\n",
        escape_html(&display.board),
        escape_html(&display.mode)
    );
    html.push_str(&flag_checkbox(display, DisplayFlag::TouchControl, "radio1", "Touchscreen"));
    html.push_str(&flag_checkbox(display, DisplayFlag::WifiInfo, "radio2", "Network info"));
    html
}

/// Checkbox that navigates to the opposite of the flag's current state
fn flag_checkbox(display: &DisplayConfig, flag: DisplayFlag, id: &str, label: &str) -> String {
    let on = display.flag(flag);
    format!(
        "<p><input {}type='checkbox' name='{}' value='{}' id='{}' onclick=\"{{location.href='/{}-' + this.value;}}\">{}</p>\n",
        if on { "checked " } else { "" },
        flag.path_prefix(),
        if on { "off" } else { "on" },
        id,
        flag.path_prefix(),
        label
    )
}

fn generate_line_table(table: &PortTable, display: &DisplayConfig) -> String {
    let mut html = String::from(
        "<table>\n<tr><th>Port</th><th>Mode</th><th>Control</th><th>Value</th><th>Comment</th></tr>\n",
    );
    for line in table.iter() {
        html.push_str(&generate_line_row(line, display));
    }
    html.push_str("</table>\n");
    html
}

fn generate_line_row(line: &Line, display: &DisplayConfig) -> String {
    let nn = format!("{:02}", line.index());
    let (control, value) = match *line.state() {
        LineState::DigitalOut { level } => (
            format!(
                "<a href=\"/P{nn}-on\"><button>ON</button></a> <a href=\"/P{nn}-off\"><button>OFF</button></a>"
            ),
            level_label(level),
        ),
        LineState::DigitalIn { level } => (String::new(), level_label(level)),
        LineState::PwmOut { duty, .. } => {
            let event = if display.touch_control { "ontouchend" } else { "onmouseup" };
            (
                format!(
                    "<input type='range' min='0' max='100' value='{duty}' step='{SLIDER_STEP}' class='slider' id='pot{nn}' {event}=\"{{location.href='/P{nn}-' + this.value + 'pwm';}}\">"
                ),
                format!("<span style=\"color:black;\">{duty}</span>"),
            )
        }
        LineState::AnalogIn { value, .. } => (String::new(), format!("{:.2}", value)),
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        escape_html(line.name()),
        line.state().direction(),
        control,
        value,
        escape_html(line.comment())
    )
}

fn level_label(level: Level) -> String {
    let color = match level {
        Level::High => "green",
        Level::Low => "red",
    };
    format!("<span style=\"color:{};\">{}</span>", color, level.label())
}

fn generate_footer(display: &DisplayConfig) -> String {
    let mut html = String::new();
    if display.wifi_info {
        html.push_str(&format!(
            "<p>Network info: {}</p>\n",
            escape_html(&display.network.summary())
        ));
    }
    html.push_str("</body></html>\n");
    html
}

/// Escape text placed into HTML
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
