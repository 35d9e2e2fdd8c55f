use crate::world::cell::{CubeCoord, FractionalCube, HexCoord};

/// Circumradius of a hex in pixels (pointy-top layout).
pub const HEX_SIZE: f64 = 30.0;
pub const HEX_HEIGHT: f64 = 2.0 * HEX_SIZE;
/// `sqrt(3) * HEX_SIZE`, also the horizontal distance between column centres.
pub const HEX_WIDTH: f64 = 1.732_050_807_568_877_2 * HEX_SIZE;
pub const GRID_HORIZ_SPACING: f64 = HEX_WIDTH;
pub const GRID_VERT_SPACING: f64 = HEX_HEIGHT * 3.0 / 4.0;

/// Where unrepresentable pixel positions resolve. Outside every grid.
pub const OFF_GRID: HexCoord = HexCoord::new(i32::MIN, i32::MIN);
/// Largest fractional cube component `pixel_to_offset` will round.
const MAX_CUBE_COMPONENT: f64 = (i32::MAX / 4) as f64;

fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Halves round toward positive infinity.
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Project a pixel position onto fractional cube coordinates (axial projection).
pub fn pixel_to_cube(x: f64, y: f64) -> FractionalCube {
    let q = (3.0_f64.sqrt() / 3.0 * x - 1.0 / 3.0 * y) / HEX_SIZE;
    let r = (2.0 / 3.0 * y) / HEX_SIZE;
    FractionalCube {
        x: q,
        y: -q - r,
        z: r,
    }
}

/// Round fractional cube coordinates to the containing hex.
///
/// Each axis is rounded independently, then the axis with the largest rounding
/// error is recomputed from the other two so that `x + y + z == 0` holds.
pub fn round_cube(cube: FractionalCube) -> CubeCoord {
    let mut rx = round_half_up(cube.x);
    let mut ry = round_half_up(cube.y);
    let mut rz = round_half_up(cube.z);

    let x_diff = (rx - cube.x).abs();
    let y_diff = (ry - cube.y).abs();
    let z_diff = (rz - cube.z).abs();

    if x_diff > y_diff && x_diff > z_diff {
        rx = -ry - rz;
    } else if y_diff > z_diff {
        ry = -rx - rz;
    } else {
        rz = -rx - ry;
    }

    CubeCoord {
        x: rx as i32,
        y: ry as i32,
        z: rz as i32,
    }
}

/// Cube to odd-r offset coordinates.
pub fn cube_to_offset(cube: CubeCoord) -> HexCoord {
    let z = cube.z as i64;
    let col = cube.x as i64 + (z - (z & 1)) / 2;
    HexCoord::new(cube.z, saturate(col))
}

/// Odd-r offset to cube coordinates.
pub fn offset_to_cube(hex: HexCoord) -> CubeCoord {
    let r = hex.row as i64;
    let q = hex.col as i64 - (r - (r & 1)) / 2;
    CubeCoord {
        x: saturate(q),
        y: saturate(-q - r),
        z: hex.row,
    }
}

/// Number of hex steps between two cells.
pub fn cube_distance(a: CubeCoord, b: CubeCoord) -> i32 {
    let d = |p: i32, q: i32| (p as i64 - q as i64).abs();
    saturate((d(a.x, b.x) + d(a.y, b.y) + d(a.z, b.z)) / 2)
}

/// Hex steps between two offset coordinates.
pub fn offset_distance(a: HexCoord, b: HexCoord) -> i32 {
    cube_distance(offset_to_cube(a), offset_to_cube(b))
}

/// Resolve a pixel position to the offset cell that contains it.
///
/// The grid is drawn with cell (0, 0) centred at `(HEX_WIDTH/2, HEX_HEIGHT/2)`,
/// so the half-hex origin is removed before projecting. The result may lie
/// outside any particular grid; bounds are the caller's concern. Non-finite
/// or astronomically distant positions give [`OFF_GRID`].
pub fn pixel_to_offset(x: f64, y: f64) -> HexCoord {
    let cube = pixel_to_cube(x - HEX_WIDTH / 2.0, y - HEX_HEIGHT / 2.0);
    let representable = [cube.x, cube.y, cube.z]
        .iter()
        .all(|v| v.is_finite() && v.abs() <= MAX_CUBE_COMPONENT);
    if !representable {
        return OFF_GRID;
    }
    cube_to_offset(round_cube(cube))
}

/// Pixel position of a cell centre. Odd rows are shifted right by half a hex.
pub fn offset_to_pixel(hex: HexCoord) -> (f64, f64) {
    let shift = (hex.row & 1) as f64 * (HEX_WIDTH / 2.0);
    let x = hex.col as f64 * HEX_WIDTH + shift + HEX_WIDTH / 2.0;
    let y = hex.row as f64 * GRID_VERT_SPACING + HEX_HEIGHT / 2.0;
    (x, y)
}

/// Grid size needed to cover a viewport, with a margin of columns on the
/// upwind edge so sources sit just off-screen.
///
/// Returns `(rows, cols)`.
pub fn grid_dimensions(viewport_width: f64, viewport_height: f64) -> (usize, usize) {
    let cols = (viewport_width.max(0.0) / GRID_HORIZ_SPACING).ceil() as usize + 2;
    let rows = (viewport_height.max(0.0) / GRID_VERT_SPACING).ceil() as usize + 1;
    (rows, cols)
}

/// Pixel extent `(width, height)` of a grid with the given shape.
pub fn grid_pixel_size(rows: usize, cols: usize) -> (f64, f64) {
    let width = cols as f64 * HEX_WIDTH + HEX_WIDTH / 2.0;
    let height = if rows == 0 {
        0.0
    } else {
        (rows - 1) as f64 * GRID_VERT_SPACING + HEX_HEIGHT
    };
    (width, height)
}
