//! CLI command action handlers

use super::App;
use crate::assets::{AssetRecord, AssetType};
use crate::db::AssetFilter;
use crate::download::DownloadReport;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:>18} [{bar:40.cyan/blue}] {percent:>3}%")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

fn print_failures(report: &DownloadReport) {
    for failure in &report.failed {
        println!("  ! {} ({})", failure.url, failure.reason);
    }
}

fn parse_type(name: &str) -> Result<AssetType> {
    name.parse::<AssetType>().with_context(|| {
        let valid: Vec<_> = AssetType::all().iter().map(AssetType::as_str).collect();
        format!("Valid types: {}", valid.join(", "))
    })
}

impl App {
    fn require_synchronized(&self) -> Result<()> {
        if !self.db.is_synchronized() {
            bail!("Asset database is not synchronized. Run 'assetsync sync' first.");
        }
        Ok(())
    }

    // ========== Sync Commands ==========

    pub async fn cmd_sync(&mut self, force: bool) -> Result<()> {
        println!("Synchronizing with {}", self.config.server.manifest_url);

        let bar = progress_bar()?;
        let report = self
            .synchronize(force, |state, fraction| {
                bar.set_message(state.to_string());
                bar.set_position((fraction * 100.0).round() as u64);
            })
            .await;
        bar.finish_and_clear();
        let report = report?;

        if !report.manifest.is_clean() {
            println!("Could not download the manifest:");
            print_failures(&report.manifest);
        }
        if !report.synchronized {
            bail!("No manifest available; the asset database is still not synchronized.");
        }

        println!(
            "Asset DB is now synchronized: {} assets, {} installed.",
            report.remote_assets, report.installed_assets
        );
        println!(
            "Previews: {} downloaded, {} failed.",
            report.metadata.succeeded,
            report.metadata.failed_count()
        );
        print_failures(&report.metadata);
        Ok(())
    }

    pub async fn cmd_rebuild(&mut self) -> Result<()> {
        self.require_synchronized()?;
        self.db.rebuild_local()?;
        println!(
            "Rebuilt installed state: {} assets installed.",
            self.db.local().len()
        );
        Ok(())
    }

    // ========== Browse Commands ==========

    pub async fn cmd_list(&self, type_name: &str, filter: &AssetFilter) -> Result<()> {
        self.require_synchronized()?;

        let assets = self.db.filtered_by_name(type_name, filter);
        if assets.is_empty() {
            println!("No assets match.");
            return Ok(());
        }

        println!("{:>8}  {:<9} {:<20} {}", "ID", "INSTALLED", "AUTHOR", "TITLE");
        println!("{:-<72}", "");
        for asset in &assets {
            let installed = if self.db.local().is_installed(asset.asset_type(), asset.id()) {
                "yes"
            } else {
                "no"
            };
            println!(
                "{:>8}  {:<9} {:<20} {}",
                asset.id(),
                installed,
                asset.author(),
                asset.title()
            );
        }
        println!("{} asset(s)", assets.len());
        Ok(())
    }

    pub async fn cmd_show(&self, type_name: &str, id: u64) -> Result<()> {
        self.require_synchronized()?;
        let asset_type = parse_type(type_name)?;
        let asset = match self.db.asset(asset_type, id) {
            Some(a) => a,
            None => bail!("No {} asset with id {}", asset_type, id),
        };

        print_asset(asset);
        let layout = self.db.layout();
        println!("Install Path: {}", asset.install_path(layout).display());
        match self.db.local().get(asset_type, id) {
            Some(installed) => println!(
                "Installed:    yes ({}, modified {})",
                installed.file.display(),
                installed.modified
            ),
            None => println!("Installed:    no"),
        }
        if let Some(thumb) = asset.thumb_path(layout).filter(|p| p.exists()) {
            println!("Thumbnail:    {}", thumb.display());
        }
        if let Some(shot) = asset.screenshot_path(layout).filter(|p| p.exists()) {
            println!("Screenshot:   {}", shot.display());
        }
        Ok(())
    }

    pub async fn cmd_authors(&self) -> Result<()> {
        self.require_synchronized()?;
        for author in self.db.known_authors() {
            println!("{}", author);
        }
        Ok(())
    }

    pub async fn cmd_categories(&self) -> Result<()> {
        self.require_synchronized()?;
        for category in self.db.known_clothes_categories() {
            println!("{}", category);
        }
        Ok(())
    }

    // ========== Download Commands ==========

    pub async fn cmd_download(&mut self, type_name: &str, id: u64) -> Result<()> {
        self.require_synchronized()?;
        let asset_type = parse_type(type_name)?;

        let bar = progress_bar()?;
        bar.set_message("downloading");
        let report = self
            .download_asset(asset_type, id, |fraction| {
                bar.set_position((fraction * 100.0).round() as u64);
            })
            .await;
        bar.finish_and_clear();
        let report = report?;

        if self.db.local().is_installed(asset_type, id) {
            println!("Finished downloading {} {}.", asset_type, id);
        } else {
            println!("{} {} could not be installed.", asset_type, id);
        }
        if !report.is_clean() {
            println!("{} of {} files failed:", report.failed_count(), report.total);
            print_failures(&report);
        }
        Ok(())
    }

    // ========== Status Commands ==========

    pub async fn cmd_status(&self) -> Result<()> {
        let layout = self.db.layout();

        println!("assetsync Status");
        println!("{:-<40}", "");
        println!("Manifest:     {}", self.config.server.manifest_url);
        println!("Asset root:   {}", layout.asset_root().display());
        println!("Install root: {}", layout.install_root().display());

        if !self.db.is_synchronized() {
            println!("Synchronized: no");
            return Ok(());
        }

        println!("Synchronized: yes");
        println!();
        println!("{:<12} {:>8} {:>10}", "TYPE", "REMOTE", "INSTALLED");
        for asset_type in AssetType::all() {
            println!(
                "{:<12} {:>8} {:>10}",
                asset_type.as_str(),
                self.db.remote().count(*asset_type),
                self.db.local().installed_count(*asset_type)
            );
        }
        Ok(())
    }

    // ========== Config Commands ==========

    pub async fn cmd_config_show(&self) -> Result<()> {
        let content =
            toml::to_string_pretty(&self.config).context("Failed to serialize config")?;
        println!("# {}", self.config.paths.config_file().display());
        print!("{}", content);
        Ok(())
    }

    pub async fn cmd_config_set_manifest_url(&mut self, url: &str) -> Result<()> {
        self.config.set_manifest_url(url)?;
        self.config.save().await?;
        println!("Manifest url set to {}", self.config.server.manifest_url);
        Ok(())
    }
}

fn print_asset(asset: &AssetRecord) {
    println!("Asset Information");
    println!("{:-<40}", "");
    println!("ID:           {}", asset.id());
    println!("Type:         {}", asset.asset_type());
    println!("Title:        {}", asset.title());
    println!("Author:       {}", asset.author());
    if !asset.category().is_empty() {
        println!("Category:     {}", asset.category());
    }
    if let Some(changed) = asset.changed() {
        println!("Changed:      {}", changed);
    }
    if !asset.description().is_empty() {
        println!("Description:  {}", asset.description());
    }
    for (role, url) in asset.files() {
        println!("File [{}]: {}", role, url);
    }
}
