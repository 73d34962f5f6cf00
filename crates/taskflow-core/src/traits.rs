/// A partial-update DTO that can be captured from an entity and written back.
///
/// Used to snapshot the fields a mutation is about to change so the mutation
/// can later be reversed by applying the snapshot.
pub trait Editable<T>: Sized {
    fn from_entity(entity: &T) -> Self;
    fn apply_to(self, entity: &mut T);
}
