#[cfg(feature = "gpu")]
mod parity {
    use encore::{
        BackendKind, DisplayListBuilder, RenderSettings, Rgba8,
        core::Rect,
        create_provider,
    };

    fn render(kind: BackendKind) -> Result<Vec<u8>, encore::EncoreError> {
        let settings = RenderSettings {
            clear_rgba: Some([0, 0, 0, 255]),
        };
        let mut provider = create_provider(kind, &settings)?;
        provider.initialize_surface(64, 64)?;

        // A rect covering every pixel with an opaque color: no anti-aliased
        // edges inside the destination, so both backends must agree exactly.
        let mut b = DisplayListBuilder::new();
        b.rect(Rect::new(-100.0, -100.0, 1000.0, 1000.0), Rgba8::WHITE);
        let list = b.freeze();

        list.render_to(provider.surface()?)?;
        provider.flush_and_submit(true)?;
        Ok(provider.surface()?.read_pixels()?.data)
    }

    #[test]
    fn cpu_and_gpu_match_on_a_solid_fill() {
        let cpu = render(BackendKind::Cpu).unwrap();
        let gpu = match render(BackendKind::Gpu) {
            Ok(v) => v,
            Err(e) if e.to_string().contains("no gpu adapter available") => return,
            Err(e) => panic!("unexpected gpu render error: {e}"),
        };

        assert_eq!(cpu.len(), gpu.len());
        assert_eq!(cpu, gpu);
        assert!(cpu.iter().all(|&x| x == 255));
    }
}
