use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Stack fixed-width id rows into a `[rows, width]` tensor. Rows are expected to be exactly
/// `width` long; short rows are padded with 0 and long rows truncated.
pub fn int_matrix<B: Backend>(rows: &[&[u32]], width: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    let height = rows.len();

    let values = rows
        .iter()
        .flat_map(|row| {
            row.iter()
                .copied()
                .chain(std::iter::repeat(0))
                .take(width)
                .map(|id| (id as i64).elem())
        })
        .collect();

    Tensor::from_data(Data::new(values, Shape::new([height, width])), device)
}

/// Create a 1D tensor of class ids
pub fn int_vector<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values = ids.iter().map(|id| (*id as i64).elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new([ids.len()])), device)
}

/// Create a `[rows, cols]` float tensor from row-major values
pub fn float_matrix<B: Backend>(
    values: &[f32],
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values = values.iter().map(|value| value.elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new([rows, cols])), device)
}
