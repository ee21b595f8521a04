use crate::Tensor;

use serde::ser::SerializeStruct;
use serde::Deserialize;

impl<T, const N: usize> serde::Serialize for Tensor<T, N>
where
    T: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Tensor", 2)?;
        state.serialize_field("shape", &self.shape.to_vec())?;
        state.serialize_field("data", self.as_slice())?;
        state.end()
    }
}

impl<'de, T, const N: usize> serde::Deserialize<'de> for Tensor<T, N>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData<T> {
            shape: Vec<usize>,
            data: Vec<T>,
        }

        let TensorData { shape, data } = TensorData::deserialize(deserializer)?;

        Tensor::from_dyn_shape_vec(&shape, data).map_err(serde::de::Error::custom)
    }
}
