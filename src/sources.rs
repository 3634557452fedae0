//! The registry of news sources.
//!
//! The built-in registry lists the Italian interprofessional funds,
//! national institutions and regional portals that are scraped on every
//! run. An alternative registry can be supplied as a YAML sequence of
//! `{category, entity, url, selector}` mappings via `--sources`.
//!
//! # Supported Sources
//!
//! | Category | Entities |
//! |----------|----------|
//! | Fondi Interprofessionali | Fondimpresa, Fondirigenti, For.Te., FonARCom, Fonter, Fondoprofessioni, Fon.Coop |
//! | Istituzioni | Invitalia, Incentivi.gov.it, SIMEST, MIMIT, Anpal (FSE+) |
//! | Regioni | Sicilia, Toscana, Lombardia, Lazio, Emilia-Romagna |

use crate::models::SourceDescriptor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

const FONDI: &str = "Fondi Interprofessionali";
const ISTITUZIONI: &str = "Istituzioni";
const REGIONI: &str = "Regioni";

#[derive(Debug, Error)]
pub enum SourcesError {
    #[error("failed to read sources file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sources file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("source registry is empty")]
    Empty,
    #[error("duplicate entity in source registry: {0}")]
    DuplicateEntity(String),
}

/// The built-in source registry, in scrape order.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(FONDI, "Fondimpresa", "https://www.fondimpresa.it/comunicazione/news", "article"),
        SourceDescriptor::new(FONDI, "Fondirigenti", "https://www.fondirigenti.it/news-eventi", ".news-item"),
        SourceDescriptor::new(FONDI, "For.Te.", "https://www.fondoforte.it/news/", ".news-post"),
        SourceDescriptor::new(FONDI, "FonARCom", "https://www.fonarcom.it/comunicazione-news/", ".news"),
        SourceDescriptor::new(FONDI, "Fonter", "https://www.fonter.it/news/", ".post"),
        SourceDescriptor::new(FONDI, "Fondoprofessioni", "https://www.fondoprofessioni.it/notizie-stampa/news/", ".news-item"),
        SourceDescriptor::new(FONDI, "Fon.Coop", "https://www.foncoop.coop/notizie/news/", ".news"),
        SourceDescriptor::new(ISTITUZIONI, "Invitalia", "https://www.invitalia.it/chi-siamo/area-media/notizie", ".news-item"),
        SourceDescriptor::new(ISTITUZIONI, "Incentivi.gov.it", "https://www.incentivi.gov.it/it/news", ".news"),
        SourceDescriptor::new(ISTITUZIONI, "SIMEST", "https://www.simest.it/sala-stampa/comunicati-stampa/", ".press-release"),
        SourceDescriptor::new(ISTITUZIONI, "MIMIT", "https://www.mimit.gov.it/it/notizie-stampa", ".news"),
        SourceDescriptor::new(ISTITUZIONI, "Anpal (FSE+)", "https://www.anpal.gov.it/notizie", ".news-item"),
        SourceDescriptor::new(
            REGIONI,
            "Regione Sicilia",
            "https://pti.regione.sicilia.it/portal/page/portal/PIR_PORTALE/PIR_LaStrutturaRegionale/PIR_AssessoratoIstruzioneFormazioneProfessionale/PIR_Infoedocumenti/PIR_Avvisiecomunicati",
            ".news",
        ),
        SourceDescriptor::new(REGIONI, "Regione Toscana", "https://www.regione.toscana.it/istruzione-formazione-e-lavoro/news", ".news-item"),
        SourceDescriptor::new(REGIONI, "Regione Lombardia", "https://www.bandi.regione.lombardia.it/servizi/notizie", ".news"),
        SourceDescriptor::new(REGIONI, "Regione Lazio", "https://www.regione.lazio.it/cittadini/formazione/news", ".news-item"),
        SourceDescriptor::new(REGIONI, "Regione Emilia-Romagna", "https://formazionelavoro.regione.emilia-romagna.it/notizie", ".news"),
    ]
}

/// Load a source registry from a YAML file.
///
/// The loaded registry is validated with [`validate_sources`] before it is
/// returned.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a YAML sequence of
/// descriptors, is empty, or names the same entity twice.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<SourceDescriptor>, SourcesError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| SourcesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let sources: Vec<SourceDescriptor> =
        serde_yaml::from_str(&raw).map_err(|source| SourcesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate_sources(&sources)?;
    info!(count = sources.len(), "Loaded source registry");
    Ok(sources)
}

/// Check that a registry is non-empty and that entity names are unique.
pub fn validate_sources(sources: &[SourceDescriptor]) -> Result<(), SourcesError> {
    if sources.is_empty() {
        return Err(SourcesError::Empty);
    }
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.entity.as_str()) {
            return Err(SourcesError::DuplicateEntity(source.entity.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_sources_are_valid() {
        let sources = default_sources();
        assert_eq!(sources.len(), 17);
        assert!(validate_sources(&sources).is_ok());
        assert!(sources.iter().all(|s| s.url.starts_with("https://")));
    }

    #[test]
    fn test_default_sources_order() {
        let sources = default_sources();
        assert_eq!(sources[0].entity, "Fondimpresa");
        assert_eq!(sources[0].selector, "article");
        assert_eq!(sources[7].category, ISTITUZIONI);
        assert_eq!(sources[16].entity, "Regione Emilia-Romagna");
        assert_eq!(sources.iter().filter(|s| s.category == FONDI).count(), 7);
        assert_eq!(sources.iter().filter(|s| s.category == REGIONI).count(), 5);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let sources = vec![
            SourceDescriptor::new(FONDI, "Fonter", "https://www.fonter.it/news/", ".post"),
            SourceDescriptor::new(FONDI, "Fonter", "https://www.fonter.it/altro/", ".post"),
        ];
        assert!(matches!(
            validate_sources(&sources),
            Err(SourcesError::DuplicateEntity(e)) if e == "Fonter"
        ));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(validate_sources(&[]), Err(SourcesError::Empty)));
    }

    #[test]
    fn test_load_sources_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
- category: Regioni
  entity: Regione Lazio
  url: https://www.regione.lazio.it/cittadini/formazione/news
  selector: .news-item
- category: Istituzioni
  entity: MIMIT
  url: https://www.mimit.gov.it/it/notizie-stampa
  selector: .news
"#
        )
        .unwrap();

        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].entity, "MIMIT");
    }

    #[test]
    fn test_load_sources_missing_file() {
        let err = load_sources("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, SourcesError::Read { .. }));
    }

    #[test]
    fn test_load_sources_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "category: [unterminated").unwrap();
        assert!(matches!(
            load_sources(file.path()),
            Err(SourcesError::Parse { .. })
        ));
    }
}
