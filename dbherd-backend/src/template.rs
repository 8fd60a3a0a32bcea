use crate::prelude::*;
use std::collections::BTreeMap;
use tokio::fs::{create_dir_all, read_dir, read_to_string, write};

pub const MASTER: &str = "APPSCALE-MASTER";
pub const SLAVES: &str = "APPSCALE-SLAVES";
pub const LOCAL: &str = "APPSCALE-LOCAL";
pub const ZOOKEEPER: &str = "APPSCALE-ZOOKEEPER";
pub const NODE_ID: &str = "APPSCALE-NODE-ID";
pub const HOME: &str = "APPSCALE-HOME";
pub const DATA: &str = "APPSCALE-DATA";
pub const REPLICATION: &str = "REPLICATION";
pub const MASTER_IP_ADDRESS: &str = "MASTER_IP_ADDRESS";

/// Placeholder token to value map.
///
/// Tokens present in a template but missing here are left untouched, and
/// tokens supplied here but absent from a template are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard tokens describing the deployment as seen from the local node.
    pub fn for_context(ctx: &Context<'_>) -> Self {
        let topology = ctx.topology();
        let layout = ctx.layout();
        let mut subs = Self::new()
            .with(MASTER, topology.master_ip())
            .with(SLAVES, topology.slave_ips().join("\n"))
            .with(LOCAL, ctx.local_ip())
            .with(ZOOKEEPER, topology.zookeeper_quorum())
            .with(HOME, layout.appscale_home().display().to_string())
            .with(DATA, layout.data_dir().display().to_string())
            .with(REPLICATION, ctx.replication().factor().to_string())
            .with(MASTER_IP_ADDRESS, topology.master_ip());
        if let Some(index) = topology.node_index(ctx.local_ip()) {
            subs.insert(NODE_ID, index.to_string());
        }
        subs
    }

    #[must_use]
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.0.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    /// Longer tokens go first, so a token that contains another one wins.
    pub fn apply(&self, text: &str) -> String {
        let mut tokens = self.0.iter().collect::<Vec<_>>();
        tokens.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tokens
            .into_iter()
            .fold(text.to_owned(), |acc, (token, value)| acc.replace(token.as_str(), value))
    }
}

pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Renders every regular file of `template_dir`, by name order, into
    /// `dest_dir` under the same name. Returns the written paths.
    /// # Errors
    /// `TemplateIo` naming the first path that could not be read or written.
    pub async fn render(
        template_dir: &Path,
        dest_dir: &Path,
        subs: &Substitutions,
    ) -> Result<Vec<PathBuf>, Error> {
        let mut entries = read_dir(template_dir)
            .await
            .map_err(|e| Error::template_io(template_dir, &e))?;
        let mut templates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::template_io(template_dir, &e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::template_io(entry.path(), &e))?;
            if file_type.is_file() {
                templates.push(entry.path());
            }
        }
        templates.sort();
        create_dir_all(dest_dir)
            .await
            .map_err(|e| Error::template_io(dest_dir, &e))?;
        let mut written = Vec::with_capacity(templates.len());
        for src in templates {
            if let Some(name) = src.file_name() {
                let dest = dest_dir.join(name);
                Self::render_file(&src, &dest, subs).await?;
                written.push(dest);
            }
        }
        debug!(
            "rendered {} templates from {} into {}",
            written.len(),
            template_dir.display(),
            dest_dir.display()
        );
        Ok(written)
    }

    pub async fn render_file(src: &Path, dest: &Path, subs: &Substitutions) -> Result<(), Error> {
        let text = read_to_string(src)
            .await
            .map_err(|e| Error::template_io(src, &e))?;
        Self::write(dest, &subs.apply(&text)).await
    }

    /// Writes generated contents, creating the parent directory if needed.
    pub async fn write(dest: &Path, contents: &str) -> Result<(), Error> {
        if let Some(parent) = dest.parent() {
            create_dir_all(parent)
                .await
                .map_err(|e| Error::template_io(parent, &e))?;
        }
        write(dest, contents)
            .await
            .map_err(|e| Error::template_io(dest, &e))?;
        trace!("wrote {}", dest.display());
        Ok(())
    }
}
