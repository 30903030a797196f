// ABOUTME: Fully qualified container image references.
// ABOUTME: Handles registry.example.com/repository:tag parsing and validation.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("image reference must include a registry host: {0}")]
    MissingRegistry(String),

    #[error("invalid registry host: {0}")]
    InvalidRegistry(String),

    #[error("invalid repository name: {0}")]
    InvalidRepository(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),
}

/// A fully qualified image reference: registry host, repository, and tag.
///
/// Unlike a local image name, a reference destined for a push must name all
/// three parts. Parsing defaults the tag to `latest` when it is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    registry: String,
    repository: String,
    tag: String,
}

impl ImageRef {
    pub fn new(registry: &str, repository: &str, tag: &str) -> Result<Self, ParseImageRefError> {
        validate_registry(registry)?;
        validate_repository(repository)?;
        validate_tag(tag)?;

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        // Check for invalid characters
        for c in input.chars() {
            if !c.is_ascii_alphanumeric()
                && c != '/'
                && c != ':'
                && c != '.'
                && c != '-'
                && c != '_'
            {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        // Split off the tag if present. A colon after the last slash is a
        // tag separator; an earlier colon belongs to a registry port.
        let (without_tag, tag) = match input.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, after.to_string()),
            _ => (input, "latest".to_string()),
        };

        let Some((registry, repository)) = without_tag.split_once('/') else {
            return Err(ParseImageRefError::MissingRegistry(input.to_string()));
        };

        // The first component names a registry host only if it contains a
        // dot or a port, or is "localhost"
        if !registry.contains('.') && !registry.contains(':') && registry != "localhost" {
            return Err(ParseImageRefError::MissingRegistry(input.to_string()));
        }

        Self::new(registry, repository, &tag)
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The same repository under a different tag.
    pub fn with_tag(&self, tag: &str) -> Result<Self, ParseImageRefError> {
        validate_tag(tag)?;

        Ok(Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: tag.to_string(),
        })
    }

    /// Registry and repository without the tag, as push APIs expect.
    pub fn repository_url(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }
}

fn validate_registry(registry: &str) -> Result<(), ParseImageRefError> {
    let (host, port) = match registry.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };

    if host.is_empty() {
        return Err(ParseImageRefError::InvalidRegistry(registry.to_string()));
    }

    if let Some(port) = port {
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseImageRefError::InvalidRegistry(registry.to_string()));
        }
    }

    for c in host.chars() {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '.' && c != '-' {
            return Err(ParseImageRefError::InvalidRegistry(registry.to_string()));
        }
    }

    Ok(())
}

fn validate_repository(repository: &str) -> Result<(), ParseImageRefError> {
    if repository.is_empty() {
        return Err(ParseImageRefError::InvalidRepository(repository.to_string()));
    }

    for segment in repository.split('/') {
        if segment.is_empty() {
            return Err(ParseImageRefError::InvalidRepository(repository.to_string()));
        }
        for c in segment.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '.' && c != '-' && c != '_' {
                return Err(ParseImageRefError::InvalidRepository(repository.to_string()));
            }
        }
    }

    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), ParseImageRefError> {
    if tag.is_empty() || tag.len() > 128 {
        return Err(ParseImageRefError::InvalidTag(tag.to_string()));
    }

    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return Err(ParseImageRefError::InvalidTag(tag.to_string())),
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '.' && c != '-' && c != '_' {
            return Err(ParseImageRefError::InvalidTag(tag.to_string()));
        }
    }

    Ok(())
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}
