//! Find models of a given concrete type among heterogeneous entities.
//!
//! Behaviors use these for cross-model wiring (a controller locating
//! the sensors it reads, say). The host passes whatever collection it
//! keeps its entities in.

use crate::entity::SimEntity;

/// The first model of type `T`, in iteration order.
pub fn find_model_by_type<'a, T, I>(entities: I) -> Option<&'a T>
where
    T: 'static,
    I: IntoIterator<Item = &'a dyn SimEntity>,
{
    entities
        .into_iter()
        .find_map(|e| e.model_any().downcast_ref::<T>())
}

/// Every model of type `T`, in iteration order.
pub fn find_models_by_type<'a, T, I>(entities: I) -> Vec<&'a T>
where
    T: 'static,
    I: IntoIterator<Item = &'a dyn SimEntity>,
{
    entities
        .into_iter()
        .filter_map(|e| e.model_any().downcast_ref::<T>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, HandlerTableBuilder, KernelContext, Model, ModelBase};
    use kairos_core::ModelId;

    macro_rules! bare_model {
        ($name:ident) => {
            struct $name {
                base: ModelBase,
            }

            impl Model for $name {
                fn base(&self) -> &ModelBase {
                    &self.base
                }
                fn base_mut(&mut self) -> &mut ModelBase {
                    &mut self.base
                }
                fn declare_handlers(_: &mut HandlerTableBuilder<Self>) {}
            }
        };
    }

    bare_model!(Sensor);
    bare_model!(Drone);

    #[test]
    fn finds_by_concrete_type() {
        let kernel = KernelContext::new();
        let entities: Vec<Box<dyn SimEntity>> = vec![
            Box::new(Entity::new(&kernel, Drone { base: ModelBase::new(ModelId(1), "d") }).unwrap()),
            Box::new(Entity::new(&kernel, Sensor { base: ModelBase::new(ModelId(2), "s1") }).unwrap()),
            Box::new(Entity::new(&kernel, Sensor { base: ModelBase::new(ModelId(3), "s2") }).unwrap()),
        ];

        let first = find_model_by_type::<Sensor, _>(entities.iter().map(|e| e.as_ref()));
        assert_eq!(first.map(|s| s.base.id()), Some(ModelId(2)));

        let all = find_models_by_type::<Sensor, _>(entities.iter().map(|e| e.as_ref()));
        assert_eq!(all.len(), 2);

        assert!(find_model_by_type::<String, _>(entities.iter().map(|e| e.as_ref())).is_none());
        assert_eq!(kernel.tables_built(), 2);
    }

    #[test]
    fn accepts_borrowed_trait_objects() {
        let kernel = KernelContext::new();
        let drone = Entity::new(&kernel, Drone { base: ModelBase::new(ModelId(1), "d") }).unwrap();
        let sensor = Entity::new(&kernel, Sensor { base: ModelBase::new(ModelId(2), "s") }).unwrap();
        let refs: [&dyn SimEntity; 2] = [&drone, &sensor];

        let found = find_model_by_type::<Sensor, _>(refs.iter().copied());
        assert_eq!(found.map(|s| s.base.id()), Some(ModelId(2)));
        assert_eq!(find_models_by_type::<Drone, _>(refs).len(), 1);
    }
}
