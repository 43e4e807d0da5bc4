use crate::cli::{Command, CreateArgs, ListArgs, OutputArgs};
use crate::error::{ErrorKind, Result};
use aicon_config::{Config, Dedup, StorageConfig};
use aicon_db::models::{DirectoryQuery, SortDirection, Status};
use aicon_db::{Database, Repository};
use aicon_pipeline::{CreateRequest, DedupPolicy, FaviconDetail, Pipeline, Settings, TokioSpawner};
use aicon_storage::BackendHandle;
use aicon_storage::backend::LocalBackend;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::io::AsyncWriteExt;

/// Everything a command needs, opened once per invocation.
pub struct App {
    db: Database,
    spawner: Arc<TokioSpawner>,
    pipeline: Pipeline,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Database::connect(&config.database.path).await.map_err(ErrorKind::database)?;
        let backend = open_backend(&config.storage).await?;
        tracing::debug!(backend = backend.name(), database = %config.database.path.display(), "opened stores");
        let spawner = Arc::new(TokioSpawner::new());
        let settings = Settings {
            default_domain: config.generation.default_domain.clone(),
            dedup: match config.generation.dedup {
                Dedup::AlwaysCreate => DedupPolicy::AlwaysCreate,
                Dedup::ReuseExisting => DedupPolicy::ReuseExisting,
            },
            ..Settings::default()
        };
        let pipeline = Pipeline::new(backend, Repository::from(&db), spawner.clone()).with_settings(settings);
        Ok(Self { db, spawner, pipeline })
    }

    /// Run one command, then wait for any generation it started.
    pub async fn run(self, command: Command) -> Result<()> {
        let result = match command {
            Command::Create(args) => self.create(args).await,
            Command::Show { slug } => self.show(&slug).await,
            Command::List(args) => self.list(args).await,
            Command::Source { id, output } => self.source(&id, &output).await,
            Command::Asset { key, output } => self.asset(&key, &output).await,
            Command::Delete { ids } => self.delete(&ids).await,
        };
        if self.spawner.in_flight() > 0 {
            tracing::info!(tasks = self.spawner.in_flight(), "waiting for background generation");
        }
        self.spawner.drain().await;
        self.db.close().await;
        result
    }

    async fn create(&self, args: CreateArgs) -> Result<()> {
        let bytes = tokio::fs::read(&args.file)
            .await
            .or_raise(|| ErrorKind::Io(args.file.display().to_string()))?;
        let mut request = match args.canvas {
            true => {
                let url = String::from_utf8_lossy(&bytes);
                CreateRequest::canvas(&url).map_err(ErrorKind::pipeline)?
            },
            false => {
                let content_type = aicon_storage::sniff_content_type(&bytes);
                CreateRequest::upload(bytes, content_type)
            },
        };
        if let Some(title) = args.title {
            request = request.with_title(title);
        }
        if let Some(domain) = args.domain {
            request = request.with_target_domain(domain);
        }
        if let Some(metadata) = args.metadata {
            request = request.with_embedded_metadata(metadata);
        }

        let created = self.pipeline.create(request).await.map_err(ErrorKind::pipeline)?;
        println!("id:     {}", created.id);
        println!("slug:   {}", created.slug);
        println!("url:    {}", created.published_url);
        if created.reused {
            println!("reused: existing favicon with identical source");
        }
        if args.detach || created.status.is_terminal() {
            println!("status: {}", created.status);
            return Ok(());
        }

        self.spawner.drain().await;
        let detail = self.pipeline.favicon(&created.id).await.map_err(ErrorKind::pipeline)?;
        print_status(&detail);
        println!("assets: {}", detail.assets.len());
        Ok(())
    }

    async fn show(&self, slug: &str) -> Result<()> {
        let detail = self.pipeline.favicon_by_slug(slug).await.map_err(ErrorKind::pipeline)?;
        let favicon = &detail.favicon;
        println!("id:       {}", favicon.id);
        println!("url:      {}", favicon.published_url);
        if let Some(title) = &favicon.title {
            println!("title:    {title}");
        }
        if let Some(domain) = &favicon.target_domain {
            println!("domain:   {domain}");
        }
        println!("source:   {} ({})", favicon.source_type, favicon.source_content_type);
        println!("created:  {}", timestamp(favicon.created_at));
        if let Some(generated_at) = favicon.generated_at {
            println!("finished: {}", timestamp(generated_at));
        }
        print_status(&detail);
        for asset in &detail.assets {
            let dimension = asset.dimension.map(|d| d.to_string()).unwrap_or_default();
            println!("  {:<4} {:<8} {:<13} {}", asset.kind.as_str(), dimension, asset.mime_type, asset.storage_key);
        }
        Ok(())
    }

    async fn list(&self, args: ListArgs) -> Result<()> {
        let query = DirectoryQuery {
            page: args.page,
            page_size: args.page_size,
            sort_by: args.sort.into(),
            direction: match args.desc {
                true => SortDirection::Descending,
                false => SortDirection::Ascending,
            },
        };
        let page = self.pipeline.list_published(&query).await.map_err(ErrorKind::pipeline)?;
        for item in &page.items {
            println!(
                "{}  {:<24} {:<24} {:>3}  {}",
                timestamp(item.created_at),
                item.target_domain.as_deref().unwrap_or("-"),
                item.title.as_deref().unwrap_or("-"),
                item.asset_count,
                item.published_url,
            );
        }
        println!("page {} ({} of {} favicons)", query.page.max(1), page.items.len(), page.total);
        Ok(())
    }

    async fn source(&self, id: &str, output: &OutputArgs) -> Result<()> {
        let blob = self.pipeline.source(id).await.map_err(ErrorKind::pipeline)?;
        tracing::debug!(content_type = blob.content_type, "source found");
        write_output(output, &blob.bytes).await
    }

    async fn asset(&self, key: &str, output: &OutputArgs) -> Result<()> {
        let blob = self.pipeline.asset(key).await.map_err(ErrorKind::pipeline)?;
        tracing::debug!(content_type = blob.content_type, "asset found");
        write_output(output, &blob.bytes).await
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let results = self.pipeline.delete_favicons(ids).await;
        let mut failed = 0;
        for result in &results {
            match &result.outcome {
                Ok(summary) if summary.blobs_failed > 0 => println!(
                    "{}: deleted, {} stored files left behind",
                    result.id, summary.blobs_failed
                ),
                Ok(_) => println!("{}: deleted", result.id),
                Err(reason) => {
                    failed += 1;
                    println!("{}: {reason}", result.id);
                },
            }
        }
        if failed > 0 {
            exn::bail!(ErrorKind::PartialFailure(failed, results.len()));
        }
        Ok(())
    }
}

async fn open_backend(config: &StorageConfig) -> Result<BackendHandle> {
    match config {
        StorageConfig::Local { root } => {
            let backend = LocalBackend::new("local", root).map_err(ErrorKind::storage)?;
            Ok(Arc::new(backend))
        },
        #[cfg(feature = "s3")]
        StorageConfig::S3 {
            bucket,
            prefix,
            region,
            endpoint,
            key_id,
            key_secret,
        } => {
            let backend = aicon_storage::backend::S3Backend::new(
                "s3",
                bucket,
                prefix.clone(),
                region,
                endpoint.clone(),
                key_id,
                key_secret,
            )
            .await
            .map_err(ErrorKind::storage)?;
            Ok(Arc::new(backend))
        },
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => {
            exn::bail!(ErrorKind::Setup("S3 storage needs a build with the `s3` feature".to_string()))
        },
    }
}

fn print_status(detail: &FaviconDetail) {
    match (&detail.favicon.status, &detail.favicon.status_error) {
        (Status::Failed, Some(reason)) => println!("status:   FAILED ({reason})"),
        (status, _) => println!("status:   {status}"),
    }
}

fn timestamp(at: UtcDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

async fn write_output(output: &OutputArgs, bytes: &[u8]) -> Result<()> {
    match &output.output {
        Some(path) => write_file(path, bytes).await,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await.or_raise(|| ErrorKind::Io("stdout".to_string()))?;
            stdout.flush().await.or_raise(|| ErrorKind::Io("stdout".to_string()))
        },
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .or_raise(|| ErrorKind::Io(path.display().to_string()))?;
    tracing::info!(path = %path.display(), size = bytes.len(), "written");
    Ok(())
}
