//! linx-server: serves uploaded files behind expiry, access key, hotlink
//! and download quota checks.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use url::Url;

use common::prelude::Secret;
use linx_object_store::ObjectStoreConfig;
use service::{Config, SiteConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on for HTTP requests
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Path prefix the site is served under
    #[arg(long, default_value = "/")]
    site_path: String,

    /// Canonical URL of the site. Derived from request headers if unset
    #[arg(long)]
    site_url: Option<Url>,

    /// Serve files to requests referred from other sites
    #[arg(long)]
    allow_hotlink: bool,

    /// Path to SQLite database file. In-memory if unset
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Directory for file contents on the local filesystem
    #[arg(long, conflicts_with = "s3_bucket")]
    files_dir: Option<PathBuf>,

    /// S3 endpoint URL (e.g. http://localhost:9000 for MinIO)
    #[arg(long, requires = "s3_bucket")]
    s3_endpoint: Option<String>,

    /// S3 bucket holding file contents
    #[arg(long)]
    s3_bucket: Option<String>,

    #[arg(long, env = "LINX_S3_ACCESS_KEY", requires = "s3_bucket")]
    s3_access_key: Option<String>,

    #[arg(long, env = "LINX_S3_SECRET_KEY", requires = "s3_bucket", hide_env_values = true)]
    s3_secret_key: Option<String>,

    #[arg(long, requires = "s3_bucket")]
    s3_region: Option<String>,

    /// Content-Security-Policy sent with every file
    #[arg(long)]
    content_security_policy: Option<String>,

    /// Referrer-Policy sent with every file
    #[arg(long)]
    referrer_policy: Option<String>,

    /// Hex encoded 32 byte key for the dedup cookie. Generated if unset
    #[arg(long, env = "LINX_DEDUP_SECRET", hide_env_values = true)]
    dedup_secret: Option<Secret>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

impl Args {
    fn object_store(&self) -> Result<ObjectStoreConfig> {
        if let Some(bucket) = &self.s3_bucket {
            let (Some(endpoint), Some(access_key), Some(secret_key)) =
                (&self.s3_endpoint, &self.s3_access_key, &self.s3_secret_key)
            else {
                bail!("--s3-bucket needs --s3-endpoint, --s3-access-key and --s3-secret-key");
            };
            return Ok(ObjectStoreConfig::S3 {
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                bucket: bucket.clone(),
                region: self.s3_region.clone(),
            });
        }

        Ok(match &self.files_dir {
            Some(path) => ObjectStoreConfig::Local { path: path.clone() },
            None => ObjectStoreConfig::Memory,
        })
    }

    fn into_config(self) -> Result<Config> {
        let object_store = self.object_store()?;

        let mut site = SiteConfig {
            site_path: self.site_path,
            site_url: self.site_url,
            allow_hotlink: self.allow_hotlink,
            ..Default::default()
        };
        if let Some(csp) = self.content_security_policy {
            site.file_content_security_policy = csp;
        }
        if let Some(policy) = self.referrer_policy {
            site.file_referrer_policy = policy;
        }

        Ok(Config {
            listen_addr: Some(self.bind),
            site,
            dedup_secret: self.dedup_secret,
            sqlite_path: self.database,
            object_store,
            log_level: self.log_level,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    service::spawn_service(&config).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Args::parse_from(["linx-server"]).into_config().unwrap();
        assert_eq!(config.listen_addr, Some("0.0.0.0:8080".parse().unwrap()));
        assert_eq!(config.site, SiteConfig::default());
        assert_eq!(config.object_store, ObjectStoreConfig::Memory);
        assert!(config.dedup_secret.is_none());
    }

    #[test]
    fn test_site_flags() {
        let config = Args::parse_from([
            "linx-server",
            "--site-path",
            "/share/",
            "--site-url",
            "https://files.example.com/share/",
            "--allow-hotlink",
            "--referrer-policy",
            "no-referrer",
            "--files-dir",
            "/var/lib/linx",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.site.site_path, "/share/");
        assert!(config.site.allow_hotlink);
        assert_eq!(config.site.file_referrer_policy, "no-referrer");
        assert_eq!(
            config.object_store,
            ObjectStoreConfig::Local {
                path: "/var/lib/linx".into()
            }
        );
    }

    #[test]
    fn test_incomplete_s3_flags() {
        let args = Args::parse_from(["linx-server", "--s3-bucket", "files"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_dedup_secret_must_be_hex() {
        let result = Args::try_parse_from(["linx-server", "--dedup-secret", "not-hex"]);
        assert!(result.is_err());
    }
}
