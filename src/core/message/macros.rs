/// Declares a message type.
///
/// The struct gets a public `header` field plus the listed fields, and
/// implements `Debug`, `Clone`, `Default`, a header-ignoring `PartialEq`,
/// [`Message`](crate::Message) and [`Record`](crate::Record). Field types must
/// implement [`FieldType`](crate::FieldType): the signed integers, `u8`..`u32`,
/// `f32`, `f64` and `String`.
///
/// ```rust
/// relay::message! {
///     /// A range reading from one sensor.
///     pub struct Reading {
///         pub sensor: String,
///         pub value: f64,
///     }
/// }
///
/// use relay::Record;
/// let r = Reading { value: 1.0, ..Default::default() };
/// assert_eq!(Reading::parse(&relay::Message::render(&r)).unwrap(), Some(r));
/// ```
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name {
            pub header: $crate::Header,
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }

        impl PartialEq for $name {
            fn eq(&self, _other: &Self) -> bool {
                true $( && self.$field == _other.$field )*
            }
        }

        impl $crate::Message for $name {
            fn header(&self) -> &$crate::Header {
                &self.header
            }

            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn schema(&self) -> &'static $crate::Schema {
                <Self as $crate::Record>::schema_static()
            }

            fn field(&self, name: &str) -> Option<$crate::FieldValue> {
                match name {
                    $( stringify!($field) => Some($crate::FieldType::to_value(&self.$field)), )*
                    _ => None,
                }
            }

            fn clone_message(&self) -> Box<dyn $crate::Message> {
                Box::new(self.clone())
            }
        }

        impl $crate::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn schema_static() -> &'static $crate::Schema {
                static SCHEMA: std::sync::OnceLock<$crate::Schema> = std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    $crate::Schema::new(
                        stringify!($name),
                        &[ $( (stringify!($field), <$ty as $crate::FieldType>::KIND) ),* ],
                    )
                    .unwrap_or_else(|e| panic!("{}", e))
                })
            }

            fn from_header(header: $crate::Header) -> Self {
                Self {
                    header,
                    $( $field: Default::default(), )*
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                _value: $crate::FieldValue,
            ) -> Result<(), $crate::MessageError> {
                match name {
                    $( stringify!($field) => {
                        self.$field = <$ty as $crate::FieldType>::from_value(_value, name)?;
                        Ok(())
                    } )*
                    _ => Err($crate::MessageError::UnknownField {
                        type_name: stringify!($name).to_string(),
                        field: name.to_string(),
                    }),
                }
            }
        }
    };
}
