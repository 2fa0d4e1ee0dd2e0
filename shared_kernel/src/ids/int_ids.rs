/// Declares an `i64` newtype that serializes as a bare JSON number.
#[macro_export]
macro_rules! int_key {
    ($TypeName: ident) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $TypeName(i64);

        impl $TypeName {
            pub fn inner(&self) -> i64 {
                self.0
            }

            pub fn new(value: i64) -> Self {
                $TypeName(value)
            }
        }

        impl std::fmt::Display for $TypeName {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $TypeName {
            fn from(id: i64) -> Self {
                $TypeName(id)
            }
        }

        impl From<$TypeName> for i64 {
            fn from(id: $TypeName) -> Self {
                id.0
            }
        }
    };
}
