//! WGSL compute kernel for one B3/S23 generation on a torus.
//!
//! Cells are stored one `u32` per cell on the device (WGSL storage buffers
//! have no byte type). Wrap-around and thresholds mirror `rules::next_cell`.

use bytemuck::{Pod, Zeroable};

/// Workgroup edge length; the shader declares `@workgroup_size(16, 16, 1)`.
pub const WORKGROUP_SIZE: u32 = 16;

pub const ENTRY_POINT: &str = "next_generation";

pub const LIFE_SHADER: &str = r#"
struct Params {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> cells_in: array<u32>;
@group(0) @binding(2) var<storage, read_write> cells_out: array<u32>;

fn alive_at(x: u32, y: u32) -> u32 {
    return select(0u, 1u, cells_in[y * params.width + x] != 0u);
}

@compute @workgroup_size(16, 16, 1)
fn next_generation(@builtin(global_invocation_id) gid: vec3<u32>) {
    let w = params.width;
    let h = params.height;
    let x = gid.x;
    let y = gid.y;
    if (x >= w || y >= h) {
        return;
    }

    let left = (x + w - 1u) % w;
    let right = (x + 1u) % w;
    let up = (y + h - 1u) % h;
    let down = (y + 1u) % h;

    let count = alive_at(left, up) + alive_at(x, up) + alive_at(right, up)
        + alive_at(left, y) + alive_at(right, y)
        + alive_at(left, down) + alive_at(x, down) + alive_at(right, down);

    let alive = cells_in[y * w + x] != 0u;
    var next = 0u;
    if (alive && (count == 2u || count == 3u)) {
        next = 1u;
    }
    if (!alive && count == 3u) {
        next = 1u;
    }
    cells_out[y * w + x] = next;
}
"#;

/// Uniform block matching `Params` in the shader (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct KernelParams {
    pub width: u32,
    pub height: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

impl KernelParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

/// Workgroups needed to cover `extent` invocations along one axis.
#[inline]
pub fn workgroups_for(extent: u32) -> u32 {
    extent.div_ceil(WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::{ENTRY_POINT, KernelParams, LIFE_SHADER, WORKGROUP_SIZE, workgroups_for};

    #[test]
    fn params_match_uniform_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 16);
        let params = KernelParams::new(7, 9);
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(&bytes[0..4], &7u32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &9u32.to_ne_bytes());
    }

    #[test]
    fn dispatch_covers_partial_workgroups() {
        assert_eq!(workgroups_for(1), 1);
        assert_eq!(workgroups_for(WORKGROUP_SIZE), 1);
        assert_eq!(workgroups_for(WORKGROUP_SIZE + 1), 2);
        assert_eq!(workgroups_for(100), 7);
    }

    #[test]
    fn shader_declares_entry_point_and_workgroup_size() {
        assert!(LIFE_SHADER.contains(&format!("fn {ENTRY_POINT}(")));
        assert!(LIFE_SHADER.contains(&format!(
            "@workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE}, 1)"
        )));
    }
}
