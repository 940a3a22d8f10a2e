// Software renderer for the arena.
//
// Produces, from one player's point of view:
// - the screen: a column ray-cast against the arena walls with flat
//   floor/ceiling, billboarded sprites for monsters, items, other players,
//   corpses and effects, then the 2D overlays (weapon, HUD, crosshair,
//   messages, damage flash);
// - the depth buffer: per-pixel distance, 0 (near) to 255 (far);
// - the labels buffer: 0 for walls, 1 for floor/ceiling, 2..=255 for
//   labelled objects, with the matching `Label` list;
// - the automap: a top-down view of the whole arena.
//
// Everything is drawn into an RGB `Canvas` first and converted to the
// requested `ScreenFormat` at the end. The renderer only reads the `World`;
// render toggles decide what is drawn, never what happens.
//
// Sprites are drawn with a per-pixel depth test against everything drawn so
// far, so draw order does not matter for correctness.

use crate::error::EngineError;
use crate::types::{
    Buffer, FrameTarget, Label, PlayerNumber, RenderRequest, RenderSettings, ScreenFormat, Vec3,
};
use crate::world::{
    EYE_HEIGHT, EffectKind, ITEM_HEIGHT, ITEM_RADIUS, PLAYER_HEIGHT, PLAYER_RADIUS, Player, World,
};

type Rgb = [u8; 3];

/// Distance mapped to depth value 255.
const MAX_DEPTH: f64 = 2048.0;
const NEAR_PLANE: f64 = 1.0;
const FLASH_TICKS: u64 = 8;

const CEILING: Rgb = [72, 72, 80];
const FLOOR: Rgb = [96, 80, 64];
const WALL: Rgb = [150, 128, 104];
const MONSTER: Rgb = [200, 40, 40];
const ITEM: Rgb = [40, 160, 220];
const CORPSE: Rgb = [110, 20, 20];
const PUFF: Rgb = [200, 200, 200];
const BLOOD: Rgb = [160, 0, 0];
const DECAL: Rgb = [40, 40, 40];

/// Player colors by `+colorset` index: green, gray, brown, red, light gray,
/// light brown, light red, light blue.
const PLAYER_COLORS: [Rgb; 8] = [
    [0, 160, 0],
    [128, 128, 128],
    [120, 80, 40],
    [200, 0, 0],
    [192, 192, 192],
    [180, 140, 90],
    [255, 110, 110],
    [110, 160, 255],
];

struct Canvas {
    width: usize,
    height: usize,
    rgb: Vec<Rgb>,
    /// World distance per pixel, used for depth testing.
    dist: Vec<f64>,
    label: Vec<u8>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rgb: vec![[0, 0, 0]; width * height],
            dist: vec![f64::INFINITY; width * height],
            label: vec![1; width * height],
        }
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: Rgb) {
        for y in y0.min(self.height)..y1.min(self.height) {
            for x in x0.min(self.width)..x1.min(self.width) {
                self.rgb[y * self.width + x] = color;
            }
        }
    }

    fn blend_all(&mut self, color: Rgb, alpha: f64) {
        for px in &mut self.rgb {
            for c in 0..3 {
                px[c] = lerp(px[c], color[c], alpha);
            }
        }
    }
}

/// A world-space billboard.
struct Sprite {
    pos: Vec3,
    radius: f64,
    height: f64,
    color: Rgb,
    /// Object identity when this sprite gets a label.
    object: Option<SpriteObject>,
}

struct SpriteObject {
    id: u32,
    name: String,
    angle: f64,
    pitch: f64,
    velocity: Vec3,
}

struct Camera {
    pos: Vec3,
    eye_z: f64,
    dir: (f64, f64),
    /// Unit vector pointing to the camera's left.
    left: (f64, f64),
    focal: f64,
    horizon: f64,
}

pub fn render(
    world: &World,
    viewer: PlayerNumber,
    request: &RenderRequest,
    target: FrameTarget<'_>,
) -> Result<(), EngineError> {
    let player = world
        .player(viewer)
        .ok_or(EngineError::UnknownPlayer(viewer))?;
    let (width, height) = request.resolution.dimensions();
    let settings = &request.settings;

    let wants_view = target.screen.is_some()
        || target.depth.is_some()
        || target.labels_buffer.is_some()
        || target.labels.is_some();

    if wants_view {
        let mut canvas = Canvas::new(width, height);
        let camera = camera_for(player, width, height);
        draw_walls(world, &camera, &mut canvas);
        let sprites = collect_sprites(world, viewer, settings);
        let labels = draw_sprites(&camera, &sprites, &mut canvas);
        if settings.decals {
            draw_decals(world, &camera, &mut canvas);
        }

        if let Some(buf) = target.depth {
            buf.reshape(width, height, 1, false);
            for (dst, d) in buf.data.iter_mut().zip(&canvas.dist) {
                *dst = depth_value(*d);
            }
        }
        if let Some(buf) = target.labels_buffer {
            buf.reshape(width, height, 1, false);
            buf.data.copy_from_slice(&canvas.label);
        }
        if let Some(list) = target.labels {
            list.clear();
            list.extend(labels);
        }
        if let Some(buf) = target.screen {
            draw_overlays(world, player, settings, &mut canvas);
            convert(&canvas, request.format, buf);
        }
    }

    if let Some(buf) = target.automap {
        let canvas = draw_automap(world, player, width, height);
        convert(&canvas, request.format, buf);
    }
    Ok(())
}

fn camera_for(player: &Player, width: usize, height: usize) -> Camera {
    let rad = player.angle.to_radians();
    let (sin, cos) = rad.sin_cos();
    // 90 degree horizontal field of view.
    let focal = width as f64 / 2.0;
    let horizon = height as f64 / 2.0 + player.pitch.to_radians().tan() * focal;
    Camera {
        pos: player.pos,
        eye_z: player.pos.z + EYE_HEIGHT,
        dir: (cos, sin),
        left: (-sin, cos),
        focal,
        horizon: horizon.clamp(0.0, height as f64),
    }
}

fn draw_walls(world: &World, cam: &Camera, canvas: &mut Canvas) {
    let (w, h) = (canvas.width, canvas.height);
    let ceiling_z = world.map.ceiling_height;
    let floor_z = world.map.floor_height;
    for x in 0..w {
        // +1 at the left screen edge, -1 at the right.
        let offset = (w as f64 / 2.0 - (x as f64 + 0.5)) / (w as f64 / 2.0);
        let rx = cam.dir.0 + cam.left.0 * offset;
        let ry = cam.dir.1 + cam.left.1 * offset;
        // Distance along the view direction (no fisheye).
        let perp = world.wall_distance(cam.pos.x, cam.pos.y, rx, ry).max(NEAR_PLANE);
        let top = cam.horizon - (ceiling_z - cam.eye_z) / perp * cam.focal;
        let bottom = cam.horizon + (cam.eye_z - floor_z) / perp * cam.focal;
        let shade = (1.0 - perp / MAX_DEPTH).clamp(0.25, 1.0);
        let wall = scale(WALL, shade);

        for y in 0..h {
            let yf = y as f64 + 0.5;
            let i = y * w + x;
            if yf < top {
                canvas.rgb[i] = CEILING;
                canvas.label[i] = 1;
                canvas.dist[i] = plane_distance(ceiling_z - cam.eye_z, cam.horizon - yf, cam.focal)
                    .min(perp);
            } else if yf < bottom {
                canvas.rgb[i] = wall;
                canvas.label[i] = 0;
                canvas.dist[i] = perp;
            } else {
                canvas.rgb[i] = FLOOR;
                canvas.label[i] = 1;
                canvas.dist[i] = plane_distance(cam.eye_z - floor_z, yf - cam.horizon, cam.focal)
                    .min(perp);
            }
        }
    }
}

fn plane_distance(height: f64, rows_from_horizon: f64, focal: f64) -> f64 {
    if rows_from_horizon <= 0.0 {
        return f64::INFINITY;
    }
    height.abs() * focal / rows_from_horizon
}

fn collect_sprites(world: &World, viewer: PlayerNumber, settings: &RenderSettings) -> Vec<Sprite> {
    let mut sprites = Vec::new();
    for m in &world.monsters {
        if m.dead && !settings.corpses {
            continue;
        }
        sprites.push(Sprite {
            pos: m.pos,
            radius: m.spec.radius,
            height: if m.dead { m.spec.height / 4.0 } else { m.spec.height },
            color: if m.dead { CORPSE } else { MONSTER },
            object: Some(SpriteObject {
                id: m.id,
                name: m.spec.name.clone(),
                angle: m.angle,
                pitch: 0.0,
                velocity: m.vel,
            }),
        });
    }
    for item in world.items.iter().filter(|i| !i.taken) {
        sprites.push(Sprite {
            pos: item.pos,
            radius: ITEM_RADIUS,
            height: ITEM_HEIGHT,
            color: ITEM,
            object: Some(SpriteObject {
                id: item.id,
                name: item.name.clone(),
                angle: 0.0,
                pitch: 0.0,
                velocity: Vec3::default(),
            }),
        });
    }
    for p in world.players.values() {
        if p.number == viewer || (p.dead && !settings.corpses) {
            continue;
        }
        let color = PLAYER_COLORS[usize::from(p.color) % PLAYER_COLORS.len()];
        sprites.push(Sprite {
            pos: p.pos,
            radius: PLAYER_RADIUS,
            height: if p.dead { PLAYER_HEIGHT / 4.0 } else { PLAYER_HEIGHT },
            color: if p.dead { scale(color, 0.5) } else { color },
            object: Some(SpriteObject {
                id: p.id,
                name: "DoomPlayer".into(),
                angle: p.angle,
                pitch: p.pitch,
                velocity: p.vel,
            }),
        });
    }
    for e in &world.effects {
        let (visible, color) = match e.kind {
            EffectKind::Puff => (settings.effects_sprites, PUFF),
            EffectKind::Blood => (settings.particles, BLOOD),
        };
        if visible {
            sprites.push(Sprite {
                // Effects sit at eye height; lower them so `pos.z` is the base.
                pos: Vec3 {
                    z: e.pos.z - 4.0,
                    ..e.pos
                },
                radius: 4.0,
                height: 8.0,
                color,
                object: None,
            });
        }
    }
    sprites
}

/// Project and draw sprites; returns labels for those with visible pixels.
fn draw_sprites(cam: &Camera, sprites: &[Sprite], canvas: &mut Canvas) -> Vec<Label> {
    let (w, h) = (canvas.width, canvas.height);

    // Label values go to labelled sprites in object id order.
    let mut order: Vec<usize> = (0..sprites.len())
        .filter(|i| sprites[*i].object.is_some())
        .collect();
    order.sort_by_key(|i| sprites[*i].object.as_ref().map_or(u32::MAX, |o| o.id));
    let mut values = vec![0u8; sprites.len()];
    for (rank, index) in order.iter().enumerate() {
        values[*index] = u8::try_from(rank + 2).unwrap_or(u8::MAX);
    }

    let mut labels = Vec::new();
    for (index, sprite) in sprites.iter().enumerate() {
        let rx = sprite.pos.x - cam.pos.x;
        let ry = sprite.pos.y - cam.pos.y;
        let fwd = rx * cam.dir.0 + ry * cam.dir.1;
        if fwd < NEAR_PLANE {
            continue;
        }
        let lat = rx * cam.left.0 + ry * cam.left.1;
        let sx = w as f64 / 2.0 - lat / fwd * cam.focal;
        let half = sprite.radius / fwd * cam.focal;
        let bottom = cam.horizon + (cam.eye_z - sprite.pos.z) / fwd * cam.focal;
        let top = cam.horizon - (sprite.pos.z + sprite.height - cam.eye_z) / fwd * cam.focal;

        let x0 = clamp_px(sx - half, w);
        let x1 = clamp_px(sx + half, w);
        let y0 = clamp_px(top, h);
        let y1 = clamp_px(bottom, h);
        let shade = (1.0 - fwd / MAX_DEPTH).clamp(0.25, 1.0);
        let color = scale(sprite.color, shade);
        let value = values[index];

        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for y in y0..y1 {
            for x in x0..x1 {
                let i = y * w + x;
                if fwd >= canvas.dist[i] {
                    continue;
                }
                canvas.rgb[i] = color;
                canvas.dist[i] = fwd;
                if sprite.object.is_some() {
                    canvas.label[i] = value;
                    bbox = Some(match bbox {
                        None => (x, y, x, y),
                        Some((ax, ay, bx, by)) => (ax.min(x), ay.min(y), bx.max(x), by.max(y)),
                    });
                }
            }
        }

        if let (Some(obj), Some((ax, ay, bx, by))) = (&sprite.object, bbox) {
            labels.push(Label {
                object_id: obj.id,
                object_name: obj.name.clone(),
                value,
                position: sprite.pos,
                angle: obj.angle,
                pitch: obj.pitch,
                roll: 0.0,
                velocity: obj.velocity,
                x: ax as u32,
                y: ay as u32,
                width: (bx - ax + 1) as u32,
                height: (by - ay + 1) as u32,
            });
        }
    }
    labels.sort_by_key(|l| l.value);
    labels
}

fn draw_decals(world: &World, cam: &Camera, canvas: &mut Canvas) {
    let (w, h) = (canvas.width, canvas.height);
    for mark in &world.decals {
        let rx = mark.x - cam.pos.x;
        let ry = mark.y - cam.pos.y;
        let fwd = rx * cam.dir.0 + ry * cam.dir.1;
        if fwd < NEAR_PLANE {
            continue;
        }
        let lat = rx * cam.left.0 + ry * cam.left.1;
        let sx = w as f64 / 2.0 - lat / fwd * cam.focal;
        let sy = cam.horizon - (mark.z - cam.eye_z) / fwd * cam.focal;
        let r = (3.0 / fwd * cam.focal).max(1.0);
        for y in clamp_px(sy - r, h)..clamp_px(sy + r, h) {
            for x in clamp_px(sx - r, w)..clamp_px(sx + r, w) {
                let i = y * w + x;
                // Only on wall pixels that are not hidden by a sprite.
                if canvas.label[i] == 0 && (canvas.dist[i] - fwd).abs() < 2.0 {
                    canvas.rgb[i] = DECAL;
                }
            }
        }
    }
}

fn draw_overlays(world: &World, player: &Player, settings: &RenderSettings, canvas: &mut Canvas) {
    let (w, h) = (canvas.width, canvas.height);

    if settings.screen_flashes {
        if let Some(hurt) = player.last_hurt {
            if world.tick.saturating_sub(hurt) < FLASH_TICKS {
                canvas.blend_all([255, 0, 0], 0.3);
            }
        }
    }

    let bar_h = if settings.hud && !settings.minimal_hud {
        h / 8
    } else {
        0
    };

    if settings.weapon && !player.dead {
        let ww = w / 8;
        let wh = h / 5;
        canvas.fill_rect(w / 2 - ww / 2, h - bar_h - wh, w / 2 + ww / 2, h - bar_h, [90, 90, 90]);
    }

    if settings.hud {
        let health = (player.health / 200.0).clamp(0.0, 1.0);
        if settings.minimal_hud {
            let mh = (h / 30).max(2);
            let mw = w / 4;
            canvas.fill_rect(4, h - mh - 4, 4 + mw, h - 4, [30, 30, 30]);
            canvas.fill_rect(4, h - mh - 4, 4 + (mw as f64 * health) as usize, h - 4, [0, 200, 0]);
        } else {
            canvas.fill_rect(0, h - bar_h, w, h, [50, 50, 50]);
            let inner = (w as f64 / 3.0 * health) as usize;
            canvas.fill_rect(w / 10, h - bar_h + bar_h / 3, w / 10 + inner, h - bar_h / 3, [0, 200, 0]);
            let armor = (player.armor / 200.0).clamp(0.0, 1.0);
            let inner = (w as f64 / 3.0 * armor) as usize;
            canvas.fill_rect(w / 2, h - bar_h + bar_h / 3, w / 2 + inner, h - bar_h / 3, [0, 120, 220]);
        }
    }

    if settings.crosshair {
        let (cx, cy) = (w / 2, h / 2);
        let arm = (w / 80).max(2);
        canvas.fill_rect(cx.saturating_sub(arm), cy, cx + arm + 1, cy + 1, [255, 255, 255]);
        canvas.fill_rect(cx, cy.saturating_sub(arm), cx + 1, cy + arm + 1, [255, 255, 255]);
    }

    if settings.messages && world.messages.iter().any(|m| m.player == player.number) {
        canvas.fill_rect(0, 0, w, (h / 30).max(2), [220, 220, 120]);
    }
}

fn draw_automap(world: &World, viewer: &Player, width: usize, height: usize) -> Canvas {
    let mut canvas = Canvas::new(width, height);
    let s = (width as f64 / world.map.width).min(height as f64 / world.map.depth) * 0.9;
    let ox = (width as f64 - world.map.width * s) / 2.0;
    let oy = (height as f64 - world.map.depth * s) / 2.0;
    // y grows downwards on screen.
    let to_px = |x: f64, y: f64| -> (f64, f64) { (ox + x * s, oy + (world.map.depth - y) * s) };

    for sector in &world.map.sectors {
        let (x0, y1) = to_px(sector.x1, sector.y1);
        let (x1, y0) = to_px(sector.x2, sector.y2);
        outline(&mut canvas, x0, y0, x1, y1, [100, 100, 100]);
    }
    let (x0, y1) = to_px(0.0, 0.0);
    let (x1, y0) = to_px(world.map.width, world.map.depth);
    outline(&mut canvas, x0, y0, x1, y1, [255, 255, 255]);

    let dot = |canvas: &mut Canvas, pos: Vec3, color: Rgb| {
        let (x, y) = to_px(pos.x, pos.y);
        let (x, y) = (x.max(1.0) as usize, y.max(1.0) as usize);
        canvas.fill_rect(x - 1, y - 1, x + 2, y + 2, color);
    };
    for m in world.monsters.iter().filter(|m| !m.dead) {
        dot(&mut canvas, m.pos, MONSTER);
    }
    for item in world.items.iter().filter(|i| !i.taken) {
        dot(&mut canvas, item.pos, ITEM);
    }
    for p in world.players.values().filter(|p| !p.dead) {
        let color = if p.number == viewer.number {
            [255, 255, 0]
        } else {
            PLAYER_COLORS[usize::from(p.color) % PLAYER_COLORS.len()]
        };
        dot(&mut canvas, p.pos, color);
    }

    // Heading tick for the viewer.
    let (sin, cos) = viewer.angle.to_radians().sin_cos();
    for step in 0..8u32 {
        let t = f64::from(step) * 3.0 / s.max(1e-6);
        let (x, y) = to_px(viewer.pos.x + cos * t, viewer.pos.y + sin * t);
        if x >= 0.0 && y >= 0.0 && (x as usize) < width && (y as usize) < height {
            canvas.rgb[y as usize * width + x as usize] = [255, 255, 0];
        }
    }
    canvas
}

fn outline(canvas: &mut Canvas, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb) {
    let (w, h) = (canvas.width, canvas.height);
    let (x0, x1) = (clamp_px(x0, w), clamp_px(x1, w).max(1) - 1);
    let (y0, y1) = (clamp_px(y0, h), clamp_px(y1, h).max(1) - 1);
    for x in x0..=x1 {
        canvas.rgb[y0 * w + x] = color;
        canvas.rgb[y1 * w + x] = color;
    }
    for y in y0..=y1 {
        canvas.rgb[y * w + x0] = color;
        canvas.rgb[y * w + x1] = color;
    }
}

/// Write the canvas into `buf` in the requested format.
fn convert(canvas: &Canvas, format: ScreenFormat, buf: &mut Buffer) {
    let (w, h) = (canvas.width, canvas.height);
    buf.reshape(w, h, format.channels(), format.is_planar());
    let plane = w * h;
    for (i, [r, g, b]) in canvas.rgb.iter().copied().enumerate() {
        match format {
            ScreenFormat::Crcgcb => {
                buf.data[i] = r;
                buf.data[plane + i] = g;
                buf.data[2 * plane + i] = b;
            }
            ScreenFormat::Cbcgcr => {
                buf.data[i] = b;
                buf.data[plane + i] = g;
                buf.data[2 * plane + i] = r;
            }
            ScreenFormat::Rgb24 => buf.data[i * 3..i * 3 + 3].copy_from_slice(&[r, g, b]),
            ScreenFormat::Bgr24 => buf.data[i * 3..i * 3 + 3].copy_from_slice(&[b, g, r]),
            ScreenFormat::Rgba32 => buf.data[i * 4..i * 4 + 4].copy_from_slice(&[r, g, b, 255]),
            ScreenFormat::Argb32 => buf.data[i * 4..i * 4 + 4].copy_from_slice(&[255, r, g, b]),
            ScreenFormat::Bgra32 => buf.data[i * 4..i * 4 + 4].copy_from_slice(&[b, g, r, 255]),
            ScreenFormat::Abgr32 => buf.data[i * 4..i * 4 + 4].copy_from_slice(&[255, b, g, r]),
            ScreenFormat::Gray8 => {
                let y = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
                buf.data[i] = y as u8;
            }
            // 3-3-2 palette index.
            ScreenFormat::Doom256Colors8 => buf.data[i] = (r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6),
        }
    }
}

fn depth_value(d: f64) -> u8 {
    if !d.is_finite() {
        return u8::MAX;
    }
    (d / MAX_DEPTH * 255.0).clamp(0.0, 255.0) as u8
}

fn clamp_px(v: f64, limit: usize) -> usize {
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        (v.ceil() as usize).min(limit)
    }
}

fn scale(c: Rgb, f: f64) -> Rgb {
    [
        (f64::from(c[0]) * f) as u8,
        (f64::from(c[1]) * f) as u8,
        (f64::from(c[2]) * f) as u8,
    ]
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EpisodeSpec, PlayerSlot};
    use crate::scenario::Scenario;
    use crate::types::{Button, ScreenResolution};

    fn world() -> World {
        let scenario = Scenario::builtin("basic").unwrap();
        World::spawn(
            scenario.map("map01").unwrap(),
            &scenario.rewards,
            &scenario.loadout,
            &[Button::MoveLeft, Button::MoveRight, Button::Attack],
            &EpisodeSpec {
                seed: 11,
                players: vec![PlayerSlot {
                    number: 1,
                    name: "P1".into(),
                    color: 0,
                }],
                deathmatch: false,
                monsters: true,
            },
        )
    }

    fn request(format: ScreenFormat) -> RenderRequest {
        RenderRequest {
            resolution: ScreenResolution::Res160X120,
            format,
            settings: RenderSettings::default(),
        }
    }

    #[test]
    fn target_is_labelled_and_boxed() {
        let mut w = world();
        // Face the target head on.
        let target = w.monsters[0].pos;
        w.players.get_mut(&1).unwrap().pos.y = target.y;

        let mut labels_buf = Buffer::new(1, 1, 1, false);
        let mut labels = Vec::new();
        render(
            &w,
            1,
            &request(ScreenFormat::Rgb24),
            FrameTarget {
                labels_buffer: Some(&mut labels_buf),
                labels: Some(&mut labels),
                ..FrameTarget::default()
            },
        )
        .unwrap();

        assert_eq!(labels.len(), 1);
        let label = &labels[0];
        assert_eq!(label.object_id, 0);
        assert_eq!(label.object_name, "Cacodemon");
        assert_eq!(label.value, 2);
        assert!(label.x <= 80 && label.x + label.width >= 80, "box straddles center");
        assert_eq!(labels_buf.width, 160);
        let center = labels_buf.get(80, (label.y + label.height / 2) as usize, 0);
        assert_eq!(center, 2);
        assert!(labels_buf.data.iter().any(|v| *v == 0), "walls present");
        assert!(labels_buf.data.iter().any(|v| *v == 1), "floor present");
    }

    #[test]
    fn every_format_has_its_shape() {
        let w = world();
        for format in [
            ScreenFormat::Crcgcb,
            ScreenFormat::Rgb24,
            ScreenFormat::Rgba32,
            ScreenFormat::Argb32,
            ScreenFormat::Cbcgcr,
            ScreenFormat::Bgr24,
            ScreenFormat::Bgra32,
            ScreenFormat::Abgr32,
            ScreenFormat::Gray8,
            ScreenFormat::Doom256Colors8,
        ] {
            let mut screen = Buffer::new(0, 0, 0, false);
            render(
                &w,
                1,
                &request(format),
                FrameTarget {
                    screen: Some(&mut screen),
                    ..FrameTarget::default()
                },
            )
            .unwrap();
            assert_eq!(screen.data.len(), 160 * 120 * format.channels());
            assert_eq!(screen.planar, format.is_planar());
        }
    }

    #[test]
    fn rgb_and_bgr_are_mirrored() {
        let w = world();
        let mut rgb = Buffer::new(0, 0, 0, false);
        let mut bgr = Buffer::new(0, 0, 0, false);
        for (format, buf) in [(ScreenFormat::Rgb24, &mut rgb), (ScreenFormat::Bgr24, &mut bgr)] {
            render(
                &w,
                1,
                &request(format),
                FrameTarget {
                    screen: Some(buf),
                    ..FrameTarget::default()
                },
            )
            .unwrap();
        }
        assert_eq!(rgb.get(5, 5, 0), bgr.get(5, 5, 2));
        assert_eq!(rgb.get(5, 5, 2), bgr.get(5, 5, 0));
    }

    #[test]
    fn depth_grows_towards_horizon() {
        let w = world();
        let mut depth = Buffer::new(0, 0, 0, false);
        render(
            &w,
            1,
            &request(ScreenFormat::Gray8),
            FrameTarget {
                depth: Some(&mut depth),
                ..FrameTarget::default()
            },
        )
        .unwrap();
        // Bottom row is floor right in front of the viewer.
        assert!(depth.get(2, 119, 0) < depth.get(2, 70, 0));
    }

    #[test]
    fn automap_is_drawn_without_view() {
        let w = world();
        let mut automap = Buffer::new(0, 0, 0, false);
        render(
            &w,
            1,
            &request(ScreenFormat::Rgb24),
            FrameTarget {
                automap: Some(&mut automap),
                ..FrameTarget::default()
            },
        )
        .unwrap();
        assert!(automap.data.iter().any(|v| *v == 255));
    }

    #[test]
    fn unknown_viewer_is_an_error() {
        let w = world();
        let err = render(&w, 4, &request(ScreenFormat::Rgb24), FrameTarget::default()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownPlayer(4)));
    }
}
