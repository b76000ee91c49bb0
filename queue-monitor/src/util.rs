use std::process::Command;

use regex::Regex;

/// Convert a Command to a string that can be run in a shell (for debug
/// purposes).
///
/// Groups of arguments prefixed with dashes are paired with their values
/// (e.g. `-l` and `eng`) and split onto multiple (escaped) lines for
/// readability.
pub fn command_to_string(cmd: &Command) -> String {
    let mut command_string = String::new();
    command_string.push_str(&cmd.get_program().to_string_lossy());

    for arg in cmd.get_args() {
        let arg_str = arg.to_string_lossy();
        command_string.push(' ');
        if arg_str.starts_with('-') {
            command_string.push_str("\\\n\t");
            command_string.push_str(&arg_str);
        } else {
            command_string.push_str(format!("{:?}", arg_str).as_str());
        }
    }

    command_string
}

/// Parses the output of `tesseract --version`, looking for the version.
/// The first line looks like one of these, depending on the build:
///
/// `tesseract 5.3.0`
/// `tesseract v5.0.0.20211201`
pub fn parse_tesseract_version(text: &str) -> Option<String> {
    lazy_static! {
        static ref REGEX_VERSION: Regex =
            Regex::new(r"(?m)^tesseract v?(\d+(?:\.\d+)*)").expect("valid version regex");
    }

    REGEX_VERSION
        .captures(text)
        .and_then(|capture| capture.get(1))
        .map(|version| version.as_str().to_string())
}

/// Parses the output of `tesseract --list-langs`: a header line followed by
/// one language code per line.
///
/// `List of available languages in "/usr/share/tesseract-ocr/5/tessdata/" (2):`
pub fn parse_tesseract_languages(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' '))
        .map(str::to_string)
        .collect()
}

/// prints as e.g. `"1:23:45.5"`
pub fn format_seconds(seconds: f64) -> String {
    let mut time_left = seconds;

    let hours = time_left as u64 / 3600;
    time_left -= hours as f64 * 3600.0;

    let minutes = time_left as u64 / 60;
    time_left -= minutes as f64 * 60.0;

    let seconds = time_left as u64;
    time_left -= seconds as f64;

    let tenths = (time_left * 10.0).round() as u64;

    let mut string = "".to_string();
    if hours > 0 {
        string += &format!("{}:", hours);
    }
    if minutes < 10 {
        string += "0";
    }
    string += &format!("{}:", minutes);
    if seconds < 10 {
        string += "0";
    }
    string += &format!("{}", seconds);
    if tenths > 0 {
        string += &format!(".{}", tenths.min(9));
    }
    string
}
