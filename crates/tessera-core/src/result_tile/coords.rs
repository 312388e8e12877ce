use crate::{
    dimension::Dimension,
    domain::CoordSource,
    error::GeometryError,
};

///
/// DimColumn
///
/// Decoded coordinates of one dimension: packed fixed-size values, or
/// start offsets into a byte buffer for strings.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DimColumn {
    Fixed(Vec<u8>),
    Var { offsets: Vec<u64>, data: Vec<u8> },
}

impl DimColumn {
    /// Pack typed values into a fixed column.
    pub fn from_values<T: crate::CoordValue>(values: &[T]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::SIZE);
        for value in values {
            value.write_le(&mut data);
        }

        Self::Fixed(data)
    }

    /// Pack strings into an offsets + data column.
    pub fn from_strings<S: AsRef<[u8]>>(values: &[S]) -> Self {
        let mut offsets = Vec::with_capacity(values.len());
        let mut data = Vec::new();
        for value in values {
            offsets.push(data.len() as u64);
            data.extend_from_slice(value.as_ref());
        }

        Self::Var { offsets, data }
    }
}

///
/// CoordBuffers
///
/// The two storage layouts a coordinate tile can arrive in.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordBuffers {
    /// One column per dimension.
    Unzipped(Vec<DimColumn>),

    /// One interleaved buffer: every cell stores all its fixed-size
    /// coordinates back to back, in dimension order.
    Zipped(Vec<u8>),
}

// Resolved once per tile so per-cell reads never re-test the layout.
#[derive(Clone, Debug)]
enum DimAccessor {
    /// Fixed-size values in `fixed[buffer]`: `width` bytes at `offset`,
    /// repeating every `stride` bytes. A column has `offset == 0` and
    /// `stride == width`.
    Strided {
        buffer: usize,
        offset: usize,
        stride: usize,
        width: usize,
    },

    /// Strings with `cell_num + 1` validated byte bounds into `data`.
    Var { bounds: Vec<usize>, data: Vec<u8> },
}

///
/// TileCoords
///
/// Validated coordinate storage plus one resolved accessor per dimension.
///

#[derive(Clone, Debug)]
pub(crate) struct TileCoords {
    fixed: Vec<Vec<u8>>,
    dims: Vec<DimAccessor>,
    cell_num: usize,
    zipped: bool,
}

fn layout_error(message: String) -> GeometryError {
    GeometryError::result_tile_validation(message)
}

impl TileCoords {
    pub(crate) fn new(dimensions: &[Dimension], buffers: CoordBuffers) -> Result<Self, GeometryError> {
        match buffers {
            CoordBuffers::Unzipped(columns) => Self::resolve_unzipped(dimensions, columns),
            CoordBuffers::Zipped(data) => Self::resolve_zipped(dimensions, data),
        }
    }

    fn resolve_unzipped(dimensions: &[Dimension], columns: Vec<DimColumn>) -> Result<Self, GeometryError> {
        if columns.len() != dimensions.len() {
            return Err(layout_error(format!(
                "expected {} coordinate columns, got {}",
                dimensions.len(),
                columns.len()
            )));
        }

        let mut fixed = Vec::new();
        let mut dims = Vec::with_capacity(columns.len());
        let mut cell_num = None;

        for (dim, column) in dimensions.iter().zip(columns) {
            let (accessor, cells) = match (dim.datatype().size(), column) {
                (Some(width), DimColumn::Fixed(data)) => {
                    if data.len() % width != 0 {
                        return Err(layout_error(format!(
                            "column '{}' has {} bytes, not a multiple of {width}",
                            dim.name(),
                            data.len()
                        )));
                    }
                    let cells = data.len() / width;
                    fixed.push(data);
                    let accessor = DimAccessor::Strided {
                        buffer: fixed.len() - 1,
                        offset: 0,
                        stride: width,
                        width,
                    };
                    (accessor, cells)
                }
                (None, DimColumn::Var { offsets, data }) => {
                    let bounds = var_bounds(dim, &offsets, data.len())?;
                    (DimAccessor::Var { bounds, data }, offsets.len())
                }
                _ => {
                    return Err(layout_error(format!(
                        "column '{}' does not match its {} datatype",
                        dim.name(),
                        dim.datatype()
                    )));
                }
            };

            match cell_num {
                Some(expected) if expected != cells => {
                    return Err(layout_error(format!(
                        "column '{}' holds {cells} cells, expected {expected}",
                        dim.name()
                    )));
                }
                _ => cell_num = Some(cells),
            }
            dims.push(accessor);
        }

        Ok(Self {
            fixed,
            dims,
            cell_num: cell_num.unwrap_or(0),
            zipped: false,
        })
    }

    fn resolve_zipped(dimensions: &[Dimension], data: Vec<u8>) -> Result<Self, GeometryError> {
        let mut widths = Vec::with_capacity(dimensions.len());
        for dim in dimensions {
            let Some(width) = dim.datatype().size() else {
                return Err(layout_error(format!(
                    "zipped coordinates cannot hold variable-sized dimension '{}'",
                    dim.name()
                )));
            };
            widths.push(width);
        }

        let stride: usize = widths.iter().sum();
        if stride == 0 || data.len() % stride != 0 {
            return Err(layout_error(format!(
                "zipped buffer of {} bytes is not a multiple of the {stride} byte cell",
                data.len()
            )));
        }

        let mut offset = 0;
        let dims = widths
            .into_iter()
            .map(|width| {
                let accessor = DimAccessor::Strided {
                    buffer: 0,
                    offset,
                    stride,
                    width,
                };
                offset += width;
                accessor
            })
            .collect();

        Ok(Self {
            cell_num: data.len() / stride,
            fixed: vec![data],
            dims,
            zipped: true,
        })
    }

    pub(crate) const fn cell_num(&self) -> usize {
        self.cell_num
    }

    pub(crate) const fn is_zipped(&self) -> bool {
        self.zipped
    }

    /// Encoded coordinate of cell `pos` on dimension `dim`.
    pub(crate) fn coord(&self, pos: usize, dim: usize) -> &[u8] {
        match &self.dims[dim] {
            DimAccessor::Strided {
                buffer,
                offset,
                stride,
                width,
            } => {
                let start = pos * stride + offset;
                &self.fixed[*buffer][start..start + width]
            }
            DimAccessor::Var { bounds, data } => &data[bounds[pos]..bounds[pos + 1]],
        }
    }
}

/// Validate string offsets and turn them into `offsets.len() + 1` byte
/// bounds, the last one being the end of `data`.
fn var_bounds(dim: &Dimension, offsets: &[u64], data_len: usize) -> Result<Vec<usize>, GeometryError> {
    let invalid = || {
        layout_error(format!(
            "string column '{}' has unsorted or out-of-bounds offsets",
            dim.name()
        ))
    };

    let mut bounds = Vec::with_capacity(offsets.len() + 1);
    for &offset in offsets {
        let offset = usize::try_from(offset).map_err(|_| invalid())?;
        if offset > data_len || bounds.last().is_some_and(|&prev| prev > offset) {
            return Err(invalid());
        }
        bounds.push(offset);
    }
    bounds.push(data_len);

    Ok(bounds)
}

///
/// CellCoords
///
/// One cell of a result tile, usable wherever the domain compares coordinates.
///

#[derive(Clone, Copy, Debug)]
pub struct CellCoords<'a> {
    pub(crate) coords: &'a TileCoords,
    pub(crate) pos: usize,
}

impl CoordSource for CellCoords<'_> {
    fn coord(&self, dim: usize) -> &[u8] {
        self.coords.coord(self.pos, dim)
    }
}
