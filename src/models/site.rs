//! Government websites monitored for PDF documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationErrors, TAKEN};

/// Bucket holding every site's PDFs.
pub const S3_BUCKET: &str = "s3://cfa-aistudio-asap-pdf";

/// A monitored website owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub primary_url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    pub fn new(user_id: i64, name: String, location: String, primary_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            location,
            primary_url,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Host of the primary URL folded into a bucket-safe key prefix.
    ///
    /// `https://www.City.org` becomes `www-city-org`. Returns `None` for a
    /// blank or hostless URL.
    pub fn s3_endpoint_prefix(&self) -> Option<String> {
        let raw = self.primary_url.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = url::Url::parse(raw).ok()?;
        let host = parsed.host_str()?.to_lowercase();

        let mut prefix = String::with_capacity(host.len());
        for c in host.chars() {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            };
            if c == '-' && prefix.ends_with('-') {
                continue;
            }
            prefix.push(c);
        }
        Some(prefix.trim_matches('-').to_string())
    }

    pub fn s3_endpoint(&self) -> Option<String> {
        self.s3_endpoint_prefix()
            .map(|prefix| format!("{}/{}", S3_BUCKET, prefix))
    }

    pub fn s3_key_for(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.s3_endpoint_prefix().unwrap_or_default(),
            filename.trim_start_matches('/')
        )
    }

    pub fn form(&self) -> SiteForm {
        SiteForm {
            name: Some(self.name.clone()),
            location: Some(self.location.clone()),
            primary_url: Some(self.primary_url.clone()),
        }
    }
}

/// Editable site attributes as submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteForm {
    pub name: Option<String>,
    pub location: Option<String>,
    pub primary_url: Option<String>,
}

impl SiteForm {
    /// Presence and URL-scheme checks.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", self.name.as_deref());
        errors.require("location", self.location.as_deref());
        if errors.require("primary_url", self.primary_url.as_deref()) {
            let raw = self.primary_url.as_deref().unwrap_or_default().trim();
            match url::Url::parse(raw) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(_) => errors.add("primary_url", "must be a valid http or https URL"),
                Err(_) => errors.add("primary_url", "is not a valid URL"),
            }
        }
        errors.into_result()
    }

    /// Overlay submitted fields on an existing site.
    pub fn merged_with(&self, site: &Site) -> SiteForm {
        SiteForm {
            name: self.name.clone().or_else(|| Some(site.name.clone())),
            location: self.location.clone().or_else(|| Some(site.location.clone())),
            primary_url: self
                .primary_url
                .clone()
                .or_else(|| Some(site.primary_url.clone())),
        }
    }

    /// Trimmed values; call only after [`SiteForm::validate`] succeeded.
    pub fn values(&self) -> (String, String, String) {
        let get = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
        (get(&self.name), get(&self.location), get(&self.primary_url))
    }
}

/// Uniqueness conflicts found for a site form among the owner's other sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteConflicts {
    pub primary_url_taken: bool,
    pub name_taken: bool,
}

impl SiteConflicts {
    pub fn into_errors(self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.primary_url_taken {
            errors.add("primary_url", TAKEN);
        }
        if self.name_taken {
            errors.add("name", TAKEN);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(url: &str) -> Site {
        Site::new(1, "Example".into(), "Somewhere".into(), url.into())
    }

    #[test]
    fn test_s3_endpoint_prefix() {
        assert_eq!(site("https://www.city.org").s3_endpoint_prefix().as_deref(), Some("www-city-org"));
        assert_eq!(
            site("https://docs.sub.city.gov").s3_endpoint_prefix().as_deref(),
            Some("docs-sub-city-gov")
        );
        assert_eq!(site("https://my-city.org").s3_endpoint_prefix().as_deref(), Some("my-city-org"));
        assert_eq!(site("https://WWW.City.ORG/path").s3_endpoint_prefix().as_deref(), Some("www-city-org"));
        assert_eq!(site("").s3_endpoint_prefix(), None);
    }

    #[test]
    fn test_s3_endpoint_and_keys() {
        let s = site("https://www.city.org");
        assert_eq!(s.s3_endpoint().as_deref(), Some("s3://cfa-aistudio-asap-pdf/www-city-org"));
        assert_eq!(s.s3_key_for("test.pdf"), "www-city-org/test.pdf");
        assert_eq!(s.s3_key_for("folder/test.pdf"), "www-city-org/folder/test.pdf");
        assert_eq!(site("").s3_endpoint(), None);
    }

    #[test]
    fn test_form_validation() {
        let ok = SiteForm {
            name: Some("City".into()),
            location: Some("Town, ST".into()),
            primary_url: Some("http://example.com".into()),
        };
        assert!(ok.validate().is_ok());

        let missing = SiteForm::default().validate().unwrap_err();
        for field in ["name", "location", "primary_url"] {
            assert!(missing.contains(field), "{} should be required", field);
        }

        let mut bad = ok.clone();
        bad.primary_url = Some("invalid_url".into());
        assert_eq!(bad.validate().unwrap_err().get("primary_url"), &["is not a valid URL".to_string()]);

        bad.primary_url = Some("ftp://example.com".into());
        assert_eq!(
            bad.validate().unwrap_err().get("primary_url"),
            &["must be a valid http or https URL".to_string()]
        );
    }

    #[test]
    fn test_merged_with_keeps_unsubmitted_fields() {
        let existing = site("https://www.city.org");
        let patch = SiteForm {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let merged = patch.merged_with(&existing);
        assert_eq!(merged.values(), ("Renamed".into(), "Somewhere".into(), "https://www.city.org".into()));
    }
}
