use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigError;
use crate::normalize::clean_text;

/// Built-in vocabulary as `(match term, display name)` pairs.
pub const BUILTIN_SKILLS: &[(&str, &str)] = &[
    // Languages
    ("python", "Python"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("c#", "C#"),
    ("c++", "C++"),
    ("php", "PHP"),
    ("ruby", "Ruby"),
    ("go", "Go"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("scala", "Scala"),
    ("rust", "Rust"),
    ("perl", "Perl"),
    // Frontend
    ("html", "HTML"),
    ("css", "CSS"),
    ("react", "React"),
    ("angular", "Angular"),
    ("vue", "Vue"),
    ("jquery", "jQuery"),
    ("bootstrap", "Bootstrap"),
    ("tailwind", "Tailwind"),
    ("sass", "Sass"),
    ("less", "Less"),
    ("svelte", "Svelte"),
    // Backend
    ("nodejs", "Node.js"),
    ("node.js", "Node.js"),
    ("django", "Django"),
    ("flask", "Flask"),
    ("spring", "Spring"),
    ("ruby on rails", "Ruby on Rails"),
    (".net", ".NET"),
    ("laravel", "Laravel"),
    ("express", "Express"),
    // Databases
    ("sql", "SQL"),
    ("mysql", "MySQL"),
    ("postgresql", "PostgreSQL"),
    ("sqlite", "SQLite"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("cassandra", "Cassandra"),
    ("elasticsearch", "Elasticsearch"),
    ("dynamodb", "DynamoDB"),
    ("oracle", "Oracle"),
    ("sql server", "SQL Server"),
    // Cloud
    ("aws", "AWS"),
    ("amazon web services", "AWS"),
    ("azure", "Azure"),
    ("gcp", "GCP"),
    ("google cloud", "GCP"),
    ("heroku", "Heroku"),
    ("digitalocean", "DigitalOcean"),
    ("kubernetes", "Kubernetes"),
    ("docker", "Docker"),
    ("terraform", "Terraform"),
    // DevOps & tools
    ("git", "Git"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("jenkins", "Jenkins"),
    ("ansible", "Ansible"),
    ("puppet", "Puppet"),
    ("chef", "Chef"),
    ("ci/cd", "CI/CD"),
    ("jira", "Jira"),
    ("linux", "Linux"),
    ("bash", "Bash"),
    // Data & ML
    ("machine learning", "Machine Learning"),
    ("data science", "Data Science"),
    ("artificial intelligence", "AI"),
    ("ai", "AI"),
    ("deep learning", "Deep Learning"),
    ("nlp", "NLP"),
    ("pandas", "Pandas"),
    ("numpy", "NumPy"),
    ("scipy", "SciPy"),
    ("scikit-learn", "scikit-learn"),
    ("tensorflow", "TensorFlow"),
    ("pytorch", "PyTorch"),
    ("keras", "Keras"),
    ("spark", "Spark"),
    ("hadoop", "Hadoop"),
    // Mobile
    ("ios", "iOS"),
    ("android", "Android"),
    ("react native", "React Native"),
    ("flutter", "Flutter"),
    // Other
    ("api", "API"),
    ("rest", "REST"),
    ("graphql", "GraphQL"),
    ("microservices", "Microservices"),
    ("agile", "Agile"),
    ("scrum", "Scrum"),
];

static BUILTIN: Lazy<Arc<SkillVocabulary>> = Lazy::new(|| {
    let entries = BUILTIN_SKILLS
        .iter()
        .filter_map(|(term, display)| SkillEntry::new(term, display).ok())
        .collect();
    Arc::new(SkillVocabulary { entries })
});

#[derive(Debug, Clone)]
struct SkillEntry {
    pattern: Regex,
    display: String,
}

impl SkillEntry {
    /// Fails only when the compiled term exceeds the regex size limit.
    fn new(term: &str, display: &str) -> Result<Self, regex::Error> {
        // Word boundaries are ASCII alphanumerics only so terms like `c++` and
        // `.net` still match.
        let pattern = format!(
            r"(?i)(?:^|[^a-z0-9]){}(?:$|[^a-z0-9])",
            regex::escape(&term.to_lowercase())
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
            display: display.to_string(),
        })
    }
}

/// Closed set of known skills matched against listing text.
#[derive(Debug, Clone)]
pub struct SkillVocabulary {
    entries: Vec<SkillEntry>,
}

impl SkillVocabulary {
    /// Process-wide built-in vocabulary, built once on first use.
    pub fn builtin() -> Arc<SkillVocabulary> {
        Arc::clone(&BUILTIN)
    }

    /// Custom vocabulary; each term is both the match term and its display name.
    pub fn from_terms<I, S>(terms: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for term in terms {
            let term = clean_text(term.as_ref());
            if term.is_empty() {
                return Err(ConfigError::EmptyVocabularyEntry);
            }
            if seen.insert(term.to_lowercase()) {
                let entry = SkillEntry::new(&term, &term)
                    .map_err(|_| ConfigError::InvalidVocabularyEntry(preview(&term)))?;
                entries.push(entry);
            }
        }
        if entries.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names of every vocabulary term found in `text`.
    pub fn match_skills(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.pattern.is_match(text))
            .map(|entry| entry.display.clone())
            .collect()
    }
}

fn preview(term: &str) -> String {
    const PREVIEW_CHARS: usize = 40;
    if term.chars().count() <= PREVIEW_CHARS {
        return term.to_string();
    }
    let mut short: String = term.chars().take(PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}
