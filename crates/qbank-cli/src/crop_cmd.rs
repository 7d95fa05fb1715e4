use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use qbank_core::{ImageAssignment, ImageRef, PixelRect, attach_images};
use qbank_raster::{
    Detection, EmptyPolicy, InkClassifier, PageRenderer, SearchWindow, crop_to, detect_region,
    load_image, save_png, stitch_vertical,
};
use tracing::{info, warn};

use crate::manifest::{
    CropManifest, ManifestPaths, STRIP_PADDING, assignment, point_rect, window,
};
use crate::shared::{Context, load_bank, public_path, require_file, save_bank};

/// Page images already decoded during this run.
#[derive(Default)]
struct PageCache {
    pages: HashMap<PathBuf, RgbaImage>,
}

impl PageCache {
    fn get(&mut self, path: &Path) -> Result<&RgbaImage, i32> {
        if !self.pages.contains_key(path) {
            let image = load_image(path).map_err(|e| {
                eprintln!("Error: {e}");
                1
            })?;
            self.pages.insert(path.to_path_buf(), image);
        }
        self.pages.get(path).ok_or(1)
    }
}

/// Totals and bank updates collected while running jobs.
#[derive(Default)]
struct CropRun {
    written: usize,
    skipped: usize,
    assignments: Vec<ImageAssignment>,
}

struct Runner<'a> {
    ctx: &'a Context,
    paths: ManifestPaths,
    ink: InkClassifier,
    dry_run: bool,
    cache: PageCache,
    renderer: Option<PageRenderer>,
    run: CropRun,
}

fn describe(detection: &Detection) -> &'static str {
    match detection {
        Detection::Fallback(_) => " (no ink, whole zone)",
        Detection::Found(_) | Detection::Empty => "",
    }
}

impl Runner<'_> {
    fn save(&mut self, image: &RgbaImage, out: &Path) -> Result<(), i32> {
        if !self.dry_run {
            save_png(image, out).map_err(|e| {
                eprintln!("Error: {e}");
                1
            })?;
        }
        self.run.written += 1;
        Ok(())
    }

    fn attach(&mut self, entry: Option<ImageAssignment>) {
        self.run.assignments.extend(entry);
    }

    /// Crop the content of `window` on `page` to `out`. Returns the region,
    /// or `None` when the job was skipped.
    fn detect_and_crop(
        &mut self,
        label: &str,
        page: &Path,
        window: &SearchWindow,
        padding: u32,
        policy: EmptyPolicy,
        out: &Path,
    ) -> Result<Option<PixelRect>, i32> {
        let ink = self.ink;
        let image = self.cache.get(page)?;
        let detection = detect_region(image, window, &ink, padding, policy);
        let Some(rect) = detection.rect() else {
            println!("{label} {} -> skipped, no content", page.display());
            self.run.skipped += 1;
            return Ok(None);
        };
        let crop = match crop_to(image, rect) {
            Ok(crop) => crop,
            Err(e) => {
                warn!(page = %page.display(), error = %e, "region is outside the page");
                println!("{label} {} -> skipped, {e}", page.display());
                self.run.skipped += 1;
                return Ok(None);
            }
        };
        println!(
            "{label} {} {rect} -> {}{}",
            page.display(),
            out.display(),
            describe(&detection)
        );
        self.save(&crop, out)?;
        Ok(Some(rect))
    }

    fn cropped_ref(&self, page: &Path, rect: PixelRect, out: &Path) -> ImageRef {
        ImageRef::Cropped {
            source_page: public_path(&self.ctx.paths, page),
            crop: rect.into(),
            diagram: Some(public_path(&self.ctx.paths, out)),
        }
    }

    fn zones(&mut self, manifest: &CropManifest) -> Result<(), i32> {
        for job in &manifest.zones {
            let page = self.paths.page(&job.page);
            let out = self.paths.out(&job.out);
            let window = window(job.y, job.x).map_err(report)?;
            let padding = job.padding.unwrap_or(self.ctx.config.detect.padding);
            let policy = if job.fallback {
                EmptyPolicy::UseWindow
            } else {
                EmptyPolicy::Skip
            };
            if let Some(rect) = self.detect_and_crop("zone", &page, &window, padding, policy, &out)? {
                let image = self.cropped_ref(&page, rect, &out);
                self.attach(assignment(job.question, job.subject.as_deref(), image));
            }
        }
        Ok(())
    }

    fn strips(&mut self, manifest: &CropManifest) -> Result<(), i32> {
        for job in &manifest.strips {
            let page = self.paths.page(&job.page);
            let out = self.paths.out(&job.out);
            let window = window(job.y, None).map_err(report)?;
            let padding = job.padding.unwrap_or(STRIP_PADDING);
            if let Some(rect) =
                self.detect_and_crop("strip", &page, &window, padding, EmptyPolicy::Skip, &out)?
            {
                let image = self.cropped_ref(&page, rect, &out);
                self.attach(assignment(job.question, job.subject.as_deref(), image));
            }
        }
        Ok(())
    }

    fn renderer(&mut self) -> Result<&PageRenderer, i32> {
        if self.renderer.is_none() {
            let renderer = PageRenderer::new().map_err(|e| {
                eprintln!("Error: {e}");
                1
            })?;
            self.renderer = Some(renderer);
        }
        self.renderer.as_ref().ok_or(1)
    }

    fn clips(&mut self, manifest: &CropManifest) -> Result<(), i32> {
        for job in &manifest.clips {
            let pdf = self.paths.file(&job.pdf);
            require_file(&pdf)?;
            let out = self.paths.out(&job.out);
            let clip = point_rect(job.rect).map_err(report)?;
            let dpi = job.dpi.unwrap_or(self.ctx.config.render.clip_dpi);

            let image = self
                .renderer()?
                .render_clip(&pdf, job.page - 1, clip, dpi)
                .map_err(|e| {
                    eprintln!("Error: {}: {e}", pdf.display());
                    1
                })?;
            println!(
                "clip {} p{} @{dpi}dpi -> {}",
                pdf.display(),
                job.page,
                out.display()
            );
            self.save(&image, &out)?;
            let image = ImageRef::diagram(public_path(&self.ctx.paths, &out));
            self.attach(assignment(job.question, job.subject.as_deref(), image));
        }
        Ok(())
    }

    fn stitches(&mut self, manifest: &CropManifest) -> Result<(), i32> {
        for job in &manifest.stitches {
            let out = self.paths.out(&job.out);
            let padding = job.padding.unwrap_or(self.ctx.config.detect.padding);
            let ink = self.ink;

            let mut parts = Vec::with_capacity(job.parts.len());
            for part in &job.parts {
                let page = self.paths.page(&part.page);
                let window = window(part.y, part.x).map_err(report)?;
                let image = self.cache.get(&page)?;
                match detect_region(image, &window, &ink, padding, EmptyPolicy::Skip).rect() {
                    Some(rect) => match crop_to(image, rect) {
                        Ok(crop) => parts.push(crop),
                        Err(e) => warn!(page = %page.display(), error = %e, "part skipped"),
                    },
                    None => warn!(page = %page.display(), "part has no content"),
                }
            }
            if parts.is_empty() {
                println!("stitch {} -> skipped, no content", out.display());
                self.run.skipped += 1;
                continue;
            }

            let stitched = stitch_vertical(&parts).map_err(|e| {
                eprintln!("Error: {e}");
                1
            })?;
            println!(
                "stitch {} part(s) {}x{} -> {}",
                parts.len(),
                stitched.width(),
                stitched.height(),
                out.display()
            );
            if !self.dry_run {
                save_png(&stitched, &out).map_err(|e| {
                    eprintln!("Error: {e}");
                    1
                })?;
            }
            self.run.written += 1;

            let source_page = job
                .parts
                .first()
                .map(|part| public_path(&self.ctx.paths, &self.paths.page(&part.page)));
            let image = ImageRef::Diagram {
                path: public_path(&self.ctx.paths, &out),
                source_page,
            };
            self.attach(assignment(job.question, job.subject.as_deref(), image));
        }
        Ok(())
    }
}

fn report(e: String) -> i32 {
    eprintln!("Error: {e}");
    1
}

pub fn run(
    manifest_path: &Path,
    bank: Option<&Path>,
    dry_run: bool,
    ctx: &Context,
) -> Result<(), i32> {
    require_file(manifest_path)?;
    let manifest = CropManifest::load(manifest_path).map_err(report)?;
    let paths = ManifestPaths::new(manifest_path, &manifest);
    let bank = bank
        .map(Path::to_path_buf)
        .or_else(|| manifest.bank.as_deref().map(|b| paths.file(b)));

    let mut runner = Runner {
        ctx,
        paths,
        ink: ctx.config.detect.ink,
        dry_run,
        cache: PageCache::default(),
        renderer: None,
        run: CropRun::default(),
    };

    runner.zones(&manifest)?;
    runner.strips(&manifest)?;
    runner.clips(&manifest)?;
    runner.stitches(&manifest)?;

    let run = runner.run;
    println!();
    let verb = if dry_run { "would write" } else { "wrote" };
    println!(
        "{} of {} job(s): {verb} {}, skipped {}",
        run.written + run.skipped,
        manifest.job_count(),
        run.written,
        run.skipped
    );
    info!(written = run.written, skipped = run.skipped, "crop manifest done");

    match bank {
        Some(bank) if !dry_run && !run.assignments.is_empty() => {
            let mut exam = load_bank(&bank)?;
            let report = attach_images(&mut exam, &run.assignments);
            save_bank(&bank, &exam, ctx)?;
            println!("Attached {} image(s) in {}", report.attached, bank.display());
            for id in &report.unmatched {
                println!("  no question {id}");
            }
        }
        Some(bank) if dry_run && !run.assignments.is_empty() => {
            println!(
                "Would attach {} image(s) in {}",
                run.assignments.len(),
                bank.display()
            );
        }
        _ => {}
    }
    Ok(())
}
