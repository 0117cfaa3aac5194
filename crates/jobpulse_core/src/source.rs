use std::fmt;
use std::str::FromStr;

/// One external job board the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    LinkedIn,
    RemoteOk,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::LinkedIn, Source::RemoteOk];

    /// Stable identifier used in configuration and export files.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::LinkedIn => "linkedin",
            Source::RemoteOk => "remoteok",
        }
    }

    /// Human-readable board name.
    pub fn display_name(self) -> &'static str {
        match self {
            Source::LinkedIn => "LinkedIn",
            Source::RemoteOk => "RemoteOK",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source {0:?}")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Source::ALL
            .into_iter()
            .find(|source| {
                source.as_str().eq_ignore_ascii_case(wanted)
                    || source.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Source;

    #[test]
    fn parses_identifiers_and_display_names() {
        assert_eq!("linkedin".parse::<Source>().unwrap(), Source::LinkedIn);
        assert_eq!(" RemoteOK ".parse::<Source>().unwrap(), Source::RemoteOk);
        assert!("glassdoor".parse::<Source>().is_err());
    }
}
