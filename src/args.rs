use std::error::Error;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Extract a single tag after -t/--tag
    pub fn extract_tag(&mut self) -> Result<String, Box<dyn Error>> {
        match self.iter.next() {
            Some(v) => {
                let tag = crate::tags::normalize_tag(&v);
                if tag.is_empty() {
                    Err(format!("Invalid tag provided to {}", self.command_name).into())
                } else {
                    Ok(tag)
                }
            }
            None => Err(format!("Provide a tag after -t/--tag for {}", self.command_name).into()),
        }
    }

    /// Extract a string value for a flag
    pub fn extract_value(&mut self, flag: &str) -> Result<String, Box<dyn Error>> {
        self.iter.next().ok_or_else(|| {
            format!("Provide a value after {} for {}", flag, self.command_name).into()
        })
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }
}

/// Flags shared by the read commands (`list`, `view`, `note`).
#[derive(Default, Debug)]
pub struct CommonFlags {
    pub tag_filters: Vec<String>,
    pub relative_time: bool,
    pub plain: bool,
    pub html: bool,
    pub positional: Vec<String>,
}

impl CommonFlags {
    /// Parse the shared flags; anything else that looks like a flag is an error.
    pub fn parse(args: Vec<String>, command_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut flags = Self::default();
        let mut parser = ArgParser::new(args, command_name);
        while let Some(arg) = parser.next() {
            match arg.as_str() {
                "-t" | "--tag" => flags.tag_filters.push(parser.extract_tag()?),
                "-r" | "--relative" => flags.relative_time = true,
                "--plain" => flags.plain = true,
                "--html" => flags.html = true,
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(format!("Unknown flag for {command_name}: {other}").into());
                }
                _ => flags.positional.push(arg),
            }
        }
        flags.tag_filters = crate::tags::normalize_tags(flags.tag_filters);
        Ok(flags)
    }
}

/// Split a `SECTION=VALUE` filter argument.
pub fn parse_filter_pair(raw: &str) -> Result<(String, String), Box<dyn Error>> {
    match raw.split_once('=') {
        Some((section, value)) if !section.trim().is_empty() && !value.trim().is_empty() => {
            Ok((section.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Expected SECTION=VALUE for --filter, got {raw:?}").into()),
    }
}
