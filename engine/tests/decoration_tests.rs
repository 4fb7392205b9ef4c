// End-to-end decoration tests
//
// Tests cover:
// - Full pipeline over a realistic page served from a MapLoader
// - Block failures staying local to the block
// - Navigation fetch failures
// - Lead image timeout
// - Format capability resolution feeding the rewriter

#[cfg(test)]
mod pipeline_tests {
    use sprig_engine::blocks::BlockError;
    use sprig_engine::{BlockRegistry, DecoratorConfig, Decorator, Dom, ImageCapabilities, LcpOutcome, MapLoader, NodeId, PageState};

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sprig</title></head>
<body>
<header></header>
<main>
  <div>
    <div>
      <p><picture><source type="image/webp" srcset="./media_1.jpg?width=2000&auto=webp"><img src="./media_1.jpg?width=2000&auto=webp" alt="lead"></picture></p>
      <h1>Welcome</h1>
    </div>
  </div>
  <div>
    <div>
      <div class="carousel"><div>one</div><div>two</div><div>three</div></div>
      <div class="broken"></div>
      <div class="columns"><div><img src="/media_2.png?auto=webp"></div></div>
    </div>
  </div>
</main>
</body>
</html>"#;

    const NAV: &str = "<div><div>Global</div><div>Items</div></div><div><div>L</div><div>C</div><div>R</div></div>";

    fn site() -> MapLoader {
        let mut loader = MapLoader::new();
        loader.insert_text("/nav.plain.html", NAV);
        loader
    }

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::builtin();
        registry.register("broken", |_: &mut Dom, _: NodeId, name: &str| {
            Err(BlockError::Malformed {
                name: name.to_string(),
                reason: "expected rows".into(),
            })
        });
        registry
    }

    #[tokio::test]
    async fn test_full_page_decoration() {
        let deco = Decorator::new(site(), registry(), DecoratorConfig::default()).unwrap();
        let mut dom = Dom::parse(PAGE);

        let report = deco.decorate(&mut dom, ImageCapabilities { webp: false }).await.unwrap();
        let root = dom.root();

        assert_eq!(report.state, PageState::PostLcp);
        assert_eq!(report.sections_wrapped, 2);
        assert!(report.hero);
        assert_eq!(report.images_rewritten, 3);
        assert!(report.nav_injected);
        assert!(report.errors.is_empty());

        let main = dom.find_first("main").unwrap();
        assert!(dom.has_class(main, "appear"));

        let hero = dom.query_selector(root, ".section-wrapper.hero").unwrap().unwrap();
        assert_eq!(
            dom.attr(hero, "style"),
            Some("background-image: url(./media_1.jpg?width=2000&format=pjpg)")
        );
        // the hero's picture was consumed, so the first section has no image left
        assert_eq!(report.lcp, Some(LcpOutcome::NoCandidate));

        let names: Vec<&str> = report.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["carousel", "broken", "columns"]);
        let blocks_section = dom.query_selector(root, ".carousel-container").unwrap().unwrap();
        assert!(dom.has_class(blocks_section, "broken-container"));
        assert!(dom.has_class(blocks_section, "columns-container"));

        let columns_img = dom.query_selector(root, ".columns img").unwrap().unwrap();
        assert_eq!(dom.attr(columns_img, "src"), Some("/media_2.png?format=png"));

        assert!(dom.query_selector(root, "header > .nav > .nav-bottom > .nav-right").unwrap().is_some());
        assert_eq!(
            report.stylesheets,
            [
                "/blocks/carousel/carousel.css",
                "/blocks/broken/broken.css",
                "/blocks/columns/columns.css",
                "/lazy-styles.css",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_block_stays_local() {
        let deco = Decorator::new(site(), registry(), DecoratorConfig::default()).unwrap();
        let mut dom = Dom::parse(PAGE);
        let report = deco.decorate(&mut dom, ImageCapabilities { webp: true }).await.unwrap();

        let failed: Vec<&str> = report.failed_blocks().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, ["broken", "columns"]);
        assert!(matches!(
            &report.loaded[2].result,
            Err(BlockError::NotRegistered { module, .. }) if module == "/blocks/columns/columns.js"
        ));

        let root = dom.root();
        let nav_items = dom.query_selector_all(root, ".carousel > .carousel-nav > .carousel-nav-item").unwrap();
        assert_eq!(nav_items.len(), 3);
        assert_eq!(dom.query_selector_all(root, ".carousel > .hidden").unwrap().len(), 2);

        let main = dom.find_first("main").unwrap();
        assert!(dom.has_class(main, "appear"));
    }

    #[tokio::test]
    async fn test_leading_id_division_shadows_the_hero() {
        // wrappers are appended after the division that keeps its id, so it
        // becomes `main > div:first-of-type`
        let page = PAGE.replace("<main>", r#"<main><div id="banner"><p>notice</p></div>"#);
        let deco = Decorator::new(site(), registry(), DecoratorConfig::default()).unwrap();
        let mut dom = Dom::parse(&page);

        let report = deco.decorate(&mut dom, ImageCapabilities { webp: true }).await.unwrap();
        assert_eq!(report.sections_wrapped, 2);
        assert!(!report.hero);
        assert_eq!(report.lcp, Some(LcpOutcome::NoCandidate));
        let root = dom.root();
        assert!(dom.query_selector(root, "main > #banner:first-child").unwrap().is_some());
        assert!(dom.query_selector(root, "picture").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_navigation_failure_is_recorded() {
        let mut loader = MapLoader::new();
        loader.fail("/nav.plain.html", 503);
        let deco = Decorator::new(loader, registry(), DecoratorConfig::default()).unwrap();
        let mut dom = Dom::parse(PAGE);

        let report = deco.decorate(&mut dom, ImageCapabilities::default()).await.unwrap();
        assert_eq!(report.state, PageState::PostLcp);
        assert!(!report.nav_injected);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].to_string().contains("503"));
        assert_eq!(report.stylesheets.last().map(String::as_str), Some("/lazy-styles.css"));
    }
}

#[cfg(test)]
mod lcp_tests {
    use std::time::Duration;

    use sprig_engine::{BlockRegistry, DecoratorConfig, Decorator, Dom, ImageCapabilities, LcpOutcome, MapLoader};

    const LEAD_IMAGE_PAGE: &str = r#"<html><head></head><body><header></header><main>
        <div><div><p><img src="/media_9.jpg?width=750"></p></div></div>
    </main></body></html>"#;

    #[tokio::test(start_paused = true)]
    async fn test_hanging_lead_image_times_out() {
        let mut loader = MapLoader::new();
        loader.hang("/media_9.jpg?width=750");
        loader.insert_text("/nav.plain.html", "<div></div>");
        let config = DecoratorConfig {
            lcp_timeout_ms: Some(3000),
            ..Default::default()
        };
        let deco = Decorator::new(loader, BlockRegistry::builtin(), config).unwrap();
        let mut dom = Dom::parse(LEAD_IMAGE_PAGE);

        let report = tokio::time::timeout(
            Duration::from_secs(60),
            deco.decorate(&mut dom, ImageCapabilities { webp: true }),
        )
        .await
        .expect("timeout should cut the wait short")
        .unwrap();

        assert!(matches!(report.lcp, Some(LcpOutcome::TimedOut { .. })));
        assert!(report.nav_injected);
        assert_eq!(report.stylesheets, ["/lazy-styles.css"]);
    }

    #[tokio::test]
    async fn test_loaded_lead_image_uses_rewritten_src() {
        let mut loader = MapLoader::new();
        loader.insert("/media_9.jpg?width=750&format=pjpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        let deco = Decorator::new(loader, BlockRegistry::builtin(), DecoratorConfig::default()).unwrap();
        let mut dom = Dom::parse(LEAD_IMAGE_PAGE);

        let report = deco.decorate(&mut dom, ImageCapabilities { webp: false }).await.unwrap();
        assert_eq!(
            report.lcp,
            Some(LcpOutcome::Loaded {
                src: "/media_9.jpg?width=750&format=pjpg".into()
            })
        );
        assert_eq!(
            deco.loader().requests().first().map(String::as_str),
            Some("/media_9.jpg?width=750&format=pjpg")
        );
    }
}

#[cfg(test)]
mod capability_tests {
    use sprig_engine::net::image::ImageType;
    use sprig_engine::net::WEBP_SUPPORT_KEY;
    use sprig_engine::{resolve_capabilities, FileSession, FormatProbe, SessionStore};

    #[test]
    fn test_probe_result_survives_reopening_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = FileSession::open(&path).unwrap();
        let broken = FormatProbe::new(ImageType::WebP, b"definitely not webp".to_vec());
        let caps = resolve_capabilities(&mut session, &broken).unwrap();
        assert!(!caps.webp);

        let mut reopened = FileSession::open(&path).unwrap();
        assert_eq!(reopened.get(WEBP_SUPPORT_KEY).as_deref(), Some("false"));
        assert!(!resolve_capabilities(&mut reopened, &FormatProbe::webp()).unwrap().webp);
    }
}
