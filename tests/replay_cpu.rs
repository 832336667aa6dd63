use std::sync::Arc;

use encore::{
    BackendKind, BlendMode, DisplayList, DisplayListBuilder, RenderSettings, Rgba8, VertexMesh,
    VertexMode,
    core::{Point, Rect},
    create_provider, replay_parallel,
    scenarios::{self, ScenarioCtx, ScenarioId},
};

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn digest_u64(bytes: &[u8]) -> u64 {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for chunk in bytes.chunks(8) {
        let mut v = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            v |= (b as u64) << (i * 8);
        }
        state = mix64(state ^ v);
    }
    state
}

fn render_once(list: &DisplayList, width: u32, height: u32) -> Vec<u8> {
    let settings = RenderSettings {
        clear_rgba: Some([255, 255, 255, 255]),
    };
    let mut provider = create_provider(BackendKind::Cpu, &settings).unwrap();
    provider.initialize_surface(width, height).unwrap();
    list.render_to(provider.surface().unwrap()).unwrap();
    provider.flush_and_submit(true).unwrap();
    provider.surface().unwrap().read_pixels().unwrap().data
}

fn mixed_list() -> DisplayList {
    let mut b = DisplayListBuilder::new();
    b.rect(Rect::new(4.0, 4.0, 40.0, 40.0), Rgba8::RED);
    b.circle(Point::new(32.0, 32.0), 12.0, Rgba8::GREEN);
    b.line(Point::new(0.0, 0.0), Point::new(64.0, 64.0), Rgba8::BLUE, 2.0);
    b.oval(Rect::new(10.0, 30.0, 50.0, 60.0), Rgba8::new(80, 80, 80, 128));
    let path = Arc::new(encore::geometry::polygon_path(
        encore::PathVerb::Quad,
        7,
        Point::new(32.0, 32.0),
        20.0,
    ));
    b.path(path, Rgba8::CYAN);
    b.freeze()
}

#[test]
fn replay_is_deterministic_across_fresh_surfaces() {
    let list = mixed_list();
    let a = render_once(&list, 64, 64);
    let b = render_once(&list, 64, 64);
    assert_eq!(digest_u64(&a), digest_u64(&b));
    assert_eq!(a, b);
}

#[test]
fn repeated_replay_on_one_surface_does_not_error() {
    let list = mixed_list();
    let settings = RenderSettings::default();
    let mut provider = create_provider(BackendKind::Cpu, &settings).unwrap();
    provider.initialize_surface(64, 64).unwrap();
    for _ in 0..3 {
        list.render_to(provider.surface().unwrap()).unwrap();
        provider.flush_and_submit(true).unwrap();
    }
}

fn solid_triangle(color: Rgba8) -> Arc<VertexMesh> {
    Arc::new(
        VertexMesh::new(
            VertexMode::Triangles,
            vec![
                Point::new(0.0, 0.0),
                Point::new(48.0, 0.0),
                Point::new(0.0, 48.0),
            ],
            vec![color; 3],
        )
        .unwrap(),
    )
}

#[test]
fn overlapping_vertices_are_order_sensitive() {
    let red = solid_triangle(Rgba8::RED);
    let green = solid_triangle(Rgba8::GREEN);

    let mut ab = DisplayListBuilder::new();
    ab.vertices(Arc::clone(&red), BlendMode::Src);
    ab.vertices(Arc::clone(&green), BlendMode::Src);

    let mut ba = DisplayListBuilder::new();
    ba.vertices(green, BlendMode::Src);
    ba.vertices(red, BlendMode::Src);

    let first = render_once(&ab.freeze(), 64, 64);
    let second = render_once(&ba.freeze(), 64, 64);
    assert_ne!(first, second, "swapping overlapping ops must change pixels");
}

#[test]
fn content_outside_the_destination_is_clipped_not_an_error() {
    let mut b = DisplayListBuilder::new();
    b.rect(Rect::new(-100.0, -100.0, 500.0, 500.0), Rgba8::RED);
    b.circle(Point::new(1000.0, 1000.0), 50.0, Rgba8::GREEN);
    let list = b.freeze();
    assert!(list.bounds().x1 > 64.0);

    // A destination far smaller than the content: replay still succeeds.
    let pixels = render_once(&list, 16, 16);
    assert_eq!(pixels.len(), 16 * 16 * 4);
    // The covering rect is visible; the far-away circle is not.
    assert_eq!(pixels[0..4], Rgba8::RED.premultiplied());
}

#[test]
fn parallel_replay_produces_identical_frames() {
    let list = mixed_list();
    let frames = replay_parallel(
        &list,
        64,
        64,
        4,
        BackendKind::Cpu,
        &RenderSettings {
            clear_rgba: Some([255, 255, 255, 255]),
        },
    )
    .unwrap();
    assert_eq!(frames.len(), 4);
    let first = digest_u64(&frames[0].data);
    for frame in &frames {
        assert_eq!(digest_u64(&frame.data), first);
    }
}

#[test]
fn scenario_workloads_replay_on_the_cpu_backend() {
    // Small sizes keep debug-build rasterization quick; every payload shape
    // (rect, path, mesh, points, image, nine-patch, shadow) is covered.
    let cases = [
        ("rects", 8),
        ("paths-cubics", 2),
        ("paths-conics", 2),
        ("vertices-trianglefan", 4),
        ("points-polygon", 256),
        ("images-upload", 8),
        ("imagerects-texture-strict", 8),
        ("imagenines-upload-nearest", 8),
        ("shadows-lines-opaque", 2),
    ];

    for (name, size) in cases {
        let id = ScenarioId::parse(name).unwrap_or_else(|| panic!("unknown scenario {name}"));
        let settings = RenderSettings {
            clear_rgba: Some([255, 255, 255, 255]),
        };
        let mut provider = create_provider(BackendKind::Cpu, &settings).unwrap();
        let workload = {
            let mut ctx = ScenarioCtx {
                provider: provider.as_mut(),
                font: None,
            };
            id.build(size, &mut ctx)
                .unwrap_or_else(|e| panic!("build {name}: {e}"))
        };
        provider
            .initialize_surface(workload.canvas_width, workload.canvas_height)
            .unwrap();
        workload
            .list
            .render_to(provider.surface().unwrap())
            .unwrap_or_else(|e| panic!("replay {name}: {e}"));
        provider.flush_and_submit(true).unwrap();
    }
}

#[test]
fn five_thousand_wrapped_rects_stay_inside_the_canvas_bounds() {
    let length = 16u64;
    let workload = scenarios::rects(length);
    assert_eq!(workload.list.len(), scenarios::RECTS_TO_DRAW);
    let bounds = workload.list.bounds();
    let canvas = (length * 2) as f64;
    assert!(bounds.x0 >= 0.0 && bounds.y0 >= 0.0, "{bounds:?}");
    assert!(bounds.x1 <= canvas && bounds.y1 <= canvas, "{bounds:?}");
}

#[test]
fn zero_sized_surface_allocation_fails_fast() {
    let mut provider = create_provider(BackendKind::Cpu, &RenderSettings::default()).unwrap();
    assert!(provider.initialize_surface(0, 64).is_err());
    assert!(provider.initialize_surface(64, 0).is_err());
}

#[test]
fn snapshot_writes_the_deterministically_named_png() {
    let dir = std::env::temp_dir().join(format!("encore-snapshot-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let workload = scenarios::rects(8);
    let settings = RenderSettings {
        clear_rgba: Some([255, 255, 255, 255]),
    };
    let mut provider = create_provider(BackendKind::Cpu, &settings).unwrap();
    provider
        .initialize_surface(workload.canvas_width, workload.canvas_height)
        .unwrap();
    workload.list.render_to(provider.surface().unwrap()).unwrap();
    provider.flush_and_submit(true).unwrap();

    let name = workload.snapshot_name(provider.backend_name());
    assert_eq!(name, "software-Rect-8.png");
    let path = dir.join(&name);
    provider.snapshot(&path).unwrap();
    assert!(path.is_file());

    let _ = std::fs::remove_dir_all(&dir);
}
